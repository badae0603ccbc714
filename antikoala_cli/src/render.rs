//! Terminal rendering of views and estimates.

use crate::colors::{self, BOLD, GREY};
use antikoala_core::engine::{format_duration, remaining_detox};
use antikoala_core::session::{peak_snapshot, session_date};
use antikoala_core::stats::PeriodSummary;
use antikoala_core::{
    drink_catalog, AppContext, DrinkKind, DrinkingSession, Estimate, EstimationMode, Result,
    UserProfile, View,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use std::collections::BTreeSet;
use unicode_width::UnicodeWidthStr;

const GAUGE_WIDTH: usize = 20;

/// Render a whole screen
pub fn render_view(ctx: &AppContext, view: &View) -> Result<()> {
    match view {
        View::List => render_list(ctx),
        View::Stats { period, anchor } => {
            let summary = ctx.summary(*period, *anchor)?;
            render_summary(&summary);
            Ok(())
        }
        View::Detail { session_id } => {
            let session = ctx.find(&session_id.to_string())?;
            render_detail(ctx, &session, ctx.profile()?.as_ref());
            Ok(())
        }
    }
}

fn clock_time(at: Option<DateTime<Utc>>, offset: &FixedOffset) -> Option<String> {
    at.map(|t| t.with_timezone(offset).format("%H:%M").to_string())
}

/// Pad `text` on the right to `width` terminal columns
///
/// Hangul and other wide characters take two columns, so `{:<N}` would
/// misalign them.
fn pad(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(used)))
}

/// Pad `text` on the left to `width` terminal columns
fn pad_left(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    format!("{}{}", " ".repeat(width.saturating_sub(used)), text)
}

fn status(session: &DrinkingSession) -> (&'static str, Option<&'static str>) {
    match (session.start_time, session.end_time) {
        (None, _) => ("대기", Some(GREY)),
        (Some(_), None) => ("진행 중", Some(colors::GREEN)),
        (Some(_), Some(_)) => ("종료", None),
    }
}

/// Status word padded to `width` before colouring, so escapes never count
fn status_label(session: &DrinkingSession, width: usize) -> String {
    let (label, color) = status(session);
    let padded = pad(label, width);
    match color {
        Some(code) => colors::paint(code, &padded),
        None => padded,
    }
}

fn render_list(ctx: &AppContext) -> Result<()> {
    let sessions = ctx.sessions()?;
    let profile = ctx.profile()?;

    if let Some(p) = &profile {
        println!("{} 님 ({}, {} kg, 주량 {}병)", p.name, p.gender.label(), p.weight_kg, p.capacity);
    }
    if sessions.is_empty() {
        println!("기록된 술자리가 없습니다. `antikoala new <이름>`으로 시작하세요.");
        return Ok(());
    }

    println!();
    println!(
        "{} {} {} {}  {} {}",
        pad("ID", 8),
        pad("날짜", 10),
        pad("상태", 8),
        pad_left("주량%", 7),
        pad("시간", 12),
        "이름"
    );
    println!("{}", "─".repeat(60));
    let now = ctx.now();
    for session in &sessions {
        let percentage = session
            .peak_percentage
            .or_else(|| profile.as_ref().map(|p| peak_snapshot(&session.counts, p)));
        let percentage = match percentage {
            Some(value) => format!("{:.1}%", value),
            None => "-".to_string(),
        };
        let duration = format_duration(session.start_time, session.end_time)
            .unwrap_or_else(|| "-".to_string());

        let mut line = format!(
            "{} {} {} {}  {} {}",
            pad(&session.short_id(), 8),
            pad(&session_date(session, ctx.offset()).to_string(), 10),
            status_label(session, 8),
            pad_left(&percentage, 7),
            pad(&duration, 12),
            session.event_name
        );
        // Ended sessions keep counting down until sober
        if let (Some(p), Some(_), Some(_)) = (&profile, session.start_time, session.end_time) {
            let estimate = ctx.estimate(session, p);
            if let Some(remaining) = remaining_detox(estimate.sober_at, now) {
                line.push_str("  ");
                line.push_str(&colors::paint(colors::BLUE, &remaining));
            }
        }
        println!("{}", line);
    }
    Ok(())
}

fn gauge(estimate: &Estimate) -> String {
    let filled = ((estimate.gauge_width() / 100.0) * GAUGE_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(GAUGE_WIDTH.saturating_sub(filled))
    );
    colors::tier(estimate.capacity_color, &bar)
}

/// Session card with counts and, when a profile exists, the full estimate
pub fn render_detail(ctx: &AppContext, session: &DrinkingSession, profile: Option<&UserProfile>) {
    let offset = ctx.offset();
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}  ({})", colors::paint(BOLD, &session.event_name), session.short_id());
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  날짜   {}   {}",
        session_date(session, offset),
        status_label(session, 0)
    );
    println!(
        "  시작   {}   종료 {}",
        colors::optional(clock_time(session.start_time, offset)),
        colors::optional(clock_time(session.end_time, offset))
    );
    println!();

    for info in drink_catalog().iter() {
        let count = session.counts.get(info.kind);
        let line = format!("  {:<6} {:>3}잔", info.name, count);
        if count == 0 {
            println!("{}", colors::paint(GREY, &line));
        } else {
            println!("{}", line);
        }
    }
    println!();

    match profile {
        Some(profile) => render_estimate(&ctx.estimate(session, profile), ctx.now(), offset),
        None => eprintln!("⚠ 프로필이 없어 계산할 수 없습니다. `antikoala profile set`으로 설정하세요."),
    }
}

fn render_estimate(estimate: &Estimate, now: DateTime<Utc>, offset: &FixedOffset) {
    if let Some(duration) = &estimate.duration {
        println!("  음주 시간  {}", duration);
    }
    println!(
        "  주량 대비  {}  {}",
        colors::tier(estimate.capacity_color, &format!("{:.1}%", estimate.percentage)),
        gauge(estimate)
    );
    if !estimate.capacity_message.is_empty() {
        println!("  {}", estimate.capacity_message);
    }

    let bac = format!("{:.4}%", estimate.current_bac);
    match estimate.mode {
        EstimationMode::Live => println!(
            "  혈중알코올농도  {} (최고 {:.4}%)",
            colors::tier(estimate.legal_color(), &bac),
            estimate.peak_bac
        ),
        EstimationMode::Peak => println!(
            "  최고 혈중알코올농도  {}",
            colors::tier(estimate.legal_color(), &bac)
        ),
    }
    if !estimate.legal_message().is_empty() {
        println!("  {}", colors::tier(estimate.legal_color(), estimate.legal_message()));
    }

    if let Some(sober) = estimate.sober_at {
        let local = sober.with_timezone(offset).format("%m-%d %H:%M");
        match remaining_detox(Some(sober), now) {
            Some(remaining) => println!("  {} ({} 해독 예상)", remaining, local),
            None => println!("  해독 완료 ({})", local),
        }
    }
}

/// One status line per watch tick
pub fn render_tick(ctx: &AppContext, session: &DrinkingSession, profile: &UserProfile) {
    let now = ctx.now();
    let estimate = ctx.estimate(session, profile);
    let remaining = remaining_detox(estimate.sober_at, now).unwrap_or_else(|| "해독 완료".into());
    println!(
        "[{}] {}  {:.1}%  {}",
        now.with_timezone(ctx.offset()).format("%H:%M:%S"),
        colors::tier(estimate.legal_color(), &format!("{:.4}%", estimate.current_bac)),
        estimate.percentage,
        remaining
    );
}

fn render_summary(summary: &PeriodSummary) {
    let title = match summary.period {
        antikoala_core::Period::Monthly => summary.anchor.format("%Y-%m").to_string(),
        antikoala_core::Period::Quarterly => {
            format!("{} Q{}", summary.anchor.year(), summary.anchor.month0() / 3 + 1)
        }
        antikoala_core::Period::Yearly => summary.anchor.year().to_string(),
    };
    println!("{} 통계 ({})", summary.period.label(), title);
    println!("  술자리      {}회", summary.session_count);
    println!("  총 알코올   {:.1} g", summary.total_grams);
    println!("  평균        {:.1} g", summary.average_grams);
    println!();

    let max = summary
        .buckets
        .iter()
        .map(|b| b.grams)
        .fold(0.0_f64, f64::max);
    for bucket in &summary.buckets {
        let width = if max > 0.0 {
            ((bucket.grams / max) * GAUGE_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!("  {:<5} {:<20} {:.1} g", bucket.label, "█".repeat(width), bucket.grams);
    }
}

/// Month grid with drinking days marked
pub fn render_calendar(year: i32, month: u32, days: &BTreeSet<NaiveDate>) -> Result<()> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        antikoala_core::Error::Validation(format!("invalid month {}-{}", year, month))
    })?;

    println!("{}년 {}월", year, month);
    println!(" 일  월  화  수  목  금  토");

    let lead = first.weekday().num_days_from_sunday() as usize;
    let mut line = "    ".repeat(lead);
    let mut date = first;
    while date.month() == month {
        let cell = if days.contains(&date) {
            colors::paint(colors::RED, &format!("{:>2}*", date.day()))
        } else {
            format!("{:>2} ", date.day())
        };
        line.push(' ');
        line.push_str(&cell);
        if date.weekday() == Weekday::Sat {
            println!("{}", line.trim_end());
            line.clear();
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    if !line.trim().is_empty() {
        println!("{}", line.trim_end());
    }
    println!();
    println!("술 마신 날: {}일", days.len());
    Ok(())
}

pub fn render_drinks() {
    println!("{:<10} {:<6} {:>7} {:>7} {:>8}", "KEY", "이름", "잔(mL)", "도수", "g/잔");
    for info in drink_catalog().iter() {
        println!(
            "{:<10} {:<6} {:>7} {:>6.1}% {:>8.2}",
            info.kind.key(),
            info.name,
            info.volume_ml,
            info.abv * 100.0,
            info.grams_per_glass()
        );
    }
}

pub fn render_profile(profile: &UserProfile) {
    println!("이름    {}", profile.name);
    println!("성별    {}", profile.gender.label());
    println!("체중    {} kg", profile.weight_kg);
    println!("주량    소주 {}병", profile.capacity);
}

pub fn render_count_change(session: &DrinkingSession, kind: DrinkKind) {
    let name = drink_catalog()
        .get(kind)
        .map(|info| info.name.clone())
        .unwrap_or_else(|| kind.key().to_string());
    println!(
        "✓ {} {}: {}잔",
        session.event_name,
        name,
        session.counts.get(kind)
    );
}
