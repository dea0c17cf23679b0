// ============================================================================
// Message Builders
// Structured outbound messages for alerts and command replies
// ============================================================================

use crate::domain::{Channel, DoctrineRequirement};
use crate::engine::{DoctrineGap, FullReport, Leaderboard, PendingMigration};
use crate::interfaces::OutboundMessage;
use chrono::{DateTime, Datelike, Utc};

/// Longest body a single message may carry, in characters
pub const MAX_BODY_CHARS: usize = 4096;

pub const COLOR_OK: u32 = 0x00ff00;
pub const COLOR_ALERT: u32 = 0xff0000;
pub const COLOR_PROMPT: u32 = 0xffff00;

const THUMBNAIL: &str = "https://i.imgur.com/ZwUn8DI.jpg";

/// Pack lines into bodies of at most `max_chars` characters, breaking only
/// between lines. A single line longer than the limit is cut at the limit.
pub fn split_lines<S: AsRef<str>>(lines: &[S], max_chars: usize) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for line in lines {
        for piece in chunk_chars(line.as_ref(), max_chars) {
            let piece_chars = piece.chars().count();
            let needed = if current.is_empty() {
                piece_chars
            } else {
                current_chars + 1 + piece_chars
            };

            if needed > max_chars && !current.is_empty() {
                bodies.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_chars += 1;
            }
            current.push_str(piece);
            current_chars += piece_chars;
        }
    }

    if !current.is_empty() {
        bodies.push(current);
    }
    bodies
}

fn chunk_chars(line: &str, max_chars: usize) -> Vec<&str> {
    if max_chars == 0 || line.chars().count() <= max_chars {
        return vec![line];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (offset, _)) in line.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            pieces.push(&line[start..offset]);
            start = offset;
        }
    }
    pieces.push(&line[start..]);
    pieces
}

fn messages(
    title: &str,
    color: u32,
    lines: &[String],
    now: DateTime<Utc>,
) -> Vec<OutboundMessage> {
    split_lines(lines, MAX_BODY_CHARS)
        .into_iter()
        .map(|body| {
            OutboundMessage::new(title, color, body)
                .at(now)
                .with_thumbnail(THUMBNAIL)
        })
        .collect()
}

/// Low-stock alert, one message series per channel with gaps (group B first)
pub fn low_stock_messages(gaps: &[DoctrineGap], now: DateTime<Utc>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    for channel in [Channel::GroupB, Channel::GroupA] {
        let lines: Vec<String> = gaps
            .iter()
            .filter(|gap| gap.channel == channel)
            .map(|gap| {
                format!(
                    "**{}** is low in stock, have {} but require {}",
                    gap.name, gap.have, gap.required
                )
            })
            .collect();
        if lines.is_empty() {
            continue;
        }
        let title = format!("Doctrine stock low [{}]", channel);
        out.extend(messages(&title, COLOR_ALERT, &lines, now));
    }
    out
}

pub fn all_stocked_message(now: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::new("Doctrine stock :ok_hand:", COLOR_OK, "")
        .at(now)
        .with_thumbnail(THUMBNAIL)
}

/// Per-channel status lines with sold counts, followed by the alert list
pub fn full_report_messages(report: &FullReport, now: DateTime<Utc>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();

    for channel in [Channel::GroupB, Channel::GroupA] {
        let lines: Vec<String> = report
            .for_channel(channel)
            .iter()
            .map(|status| {
                let marker = if status.is_missing() {
                    ":small_orange_diamond:"
                } else {
                    ":small_blue_diamond:"
                };
                format!(
                    "{} **{}** [{} sold] - stocked {}, required {}",
                    marker, status.name, status.sold, status.have, status.required
                )
            })
            .collect();
        if !lines.is_empty() {
            let title = format!(":scroll: {} doctrines full report", channel);
            out.extend(messages(&title, COLOR_OK, &lines, now));
        }
    }

    let alerts: Vec<String> = report
        .alerts
        .iter()
        .map(|alert| {
            format!(
                "**{}**: issuer {}, reason **{}**, status {:?}",
                alert.listing.title,
                report.issuer_name(alert.listing.issuer_id),
                alert.reason.label(),
                alert.listing.status
            )
        })
        .collect();
    if !alerts.is_empty() {
        out.extend(messages(":x: Problematic listings", COLOR_ALERT, &alerts, now));
    }

    out
}

/// Available stock listing, `"<count> <title>"` per line
pub fn stock_messages(counts: &[(String, u32)], now: DateTime<Utc>) -> Vec<OutboundMessage> {
    let lines: Vec<String> = counts
        .iter()
        .map(|(title, count)| format!("{} {}", count, title))
        .collect();
    messages("Have on contract", COLOR_OK, &lines, now)
}

/// Target stock per doctrine
pub fn requirement_messages(
    requirements: &[DoctrineRequirement],
    now: DateTime<Utc>,
) -> Vec<OutboundMessage> {
    let lines: Vec<String> = requirements
        .iter()
        .map(|r| {
            format!(
                "{} {} [{}] @ {}",
                r.required_count,
                r.name,
                r.channel,
                r.reference_amount()
            )
        })
        .collect();
    messages("Target stock", COLOR_OK, &lines, now)
}

pub fn leaderboard_message(board: &Leaderboard, now: DateTime<Utc>) -> OutboundMessage {
    let lines: Vec<String> = board
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let prefix = if i == 0 { ":tada: " } else { "" };
            format!(
                "{}**#{}** `{}` with **{} contracts** worth **{} M**",
                prefix,
                i + 1,
                entry.issuer_name,
                entry.contracts,
                entry.total_price / 1_000_000
            )
        })
        .collect();

    let title = if (board.start.year(), board.start.month())
        == (board.end.year(), board.end.month())
    {
        format!(":crown: Leaderboard for {}", board.start.format("%B %Y"))
    } else {
        format!(
            ":crown: Leaderboard for {} - {}",
            board.start.format("%B %Y"),
            board.end.format("%B %Y")
        )
    };

    OutboundMessage::new(title, COLOR_OK, lines.join("\n"))
        .at(now)
        .with_thumbnail(THUMBNAIL)
}

pub fn migration_prompt(pending: &PendingMigration) -> OutboundMessage {
    OutboundMessage::new(
        "Migrate :question:",
        COLOR_PROMPT,
        format!(
            "About to migrate \"{}\" -> \"{}\". Confirm to apply.",
            pending.from, pending.to
        ),
    )
    .at(pending.created_at)
    .with_thumbnail(THUMBNAIL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gap(name: &str, channel: Channel) -> DoctrineGap {
        DoctrineGap {
            name: name.to_string(),
            channel,
            required: 5,
            have: 3,
        }
    }

    #[test]
    fn test_split_respects_limit_and_line_boundaries() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {:02}", i)).collect();
        // each line is 7 chars; 3 lines + 2 newlines = 23
        let bodies = split_lines(&lines, 23);

        assert_eq!(bodies.len(), 4);
        assert_eq!(bodies[0], "line 00\nline 01\nline 02");
        assert_eq!(bodies[3], "line 09");
        assert!(bodies.iter().all(|b| b.chars().count() <= 23));
    }

    #[test]
    fn test_split_overlong_line() {
        let bodies = split_lines(&["abcdefghij"], 4);
        assert_eq!(bodies, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let bodies = split_lines(&["ééé", "ééé"], 7);
        assert_eq!(bodies, vec!["ééé\nééé"]);
    }

    #[test]
    fn test_split_empty() {
        let lines: Vec<String> = Vec::new();
        assert!(split_lines(&lines, MAX_BODY_CHARS).is_empty());
    }

    #[test]
    fn test_low_stock_messages_per_channel() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let gaps = vec![gap("Svipul", Channel::GroupA), gap("Shield Drake", Channel::GroupB)];

        let out = low_stock_messages(&gaps, now);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Doctrine stock low [Group B]");
        assert_eq!(
            out[0].body,
            "**Shield Drake** is low in stock, have 3 but require 5"
        );
        assert_eq!(out[1].title, "Doctrine stock low [Group A]");
        assert!(out.iter().all(|m| m.color == COLOR_ALERT && m.timestamp == now));
    }

    #[test]
    fn test_large_batches_are_split() {
        let now = Utc::now();
        let gaps: Vec<DoctrineGap> = (0..400)
            .map(|i| gap(&format!("Doctrine number {:04}", i), Channel::GroupA))
            .collect();

        let out = low_stock_messages(&gaps, now);

        assert!(out.len() > 1);
        assert!(out.iter().all(|m| m.body.chars().count() <= MAX_BODY_CHARS));
        let total_lines: usize = out.iter().map(|m| m.body.lines().count()).sum();
        assert_eq!(total_lines, 400);
    }

    #[test]
    fn test_full_report_alerts_use_issuer_names() {
        use crate::engine::{AlertReason, DoctrineStatus, ListingAlert};
        use crate::test_support::{listing, GROUP_A};

        let now = Utc::now();
        let mut report = FullReport::default();
        report.group_a.push(DoctrineStatus {
            name: "Svipul".to_string(),
            channel: Channel::GroupA,
            required: 2,
            have: 1,
            sold: 4,
        });
        for id in [1, 2] {
            report.alerts.push(ListingAlert {
                listing: listing(id, "Svipul", GROUP_A),
                doctrine: "Svipul".to_string(),
                reason: AlertReason::Expired,
            });
        }
        report.issuer_names.insert(1001, "Ayla Vex".to_string());

        let out = full_report_messages(&report, now);

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].body,
            ":small_orange_diamond: **Svipul** [4 sold] - stocked 1, required 2"
        );
        let alert_lines: Vec<&str> = out[1].body.lines().collect();
        assert_eq!(
            alert_lines,
            vec![
                "**Svipul**: issuer Ayla Vex, reason **Expired**, status Outstanding",
                "**Svipul**: issuer 1002, reason **Expired**, status Outstanding",
            ]
        );
        assert_eq!(out[1].color, COLOR_ALERT);
    }
}
