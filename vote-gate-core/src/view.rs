//! Projection of the gate onto what a rendering surface needs.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::gate::{GateModel, GatePhase};
use crate::types::{BallotBoxId, BallotContent, PoolId, VotePoolRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Active,
    Ended,
}

/// Title block shown above every loaded pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolHeader {
    pub title: String,
    pub status: PoolStatus,
    pub remaining: String,
    pub ballot_box_id: BallotBoxId,
}

impl PoolHeader {
    pub fn new(record: &VotePoolRecord, now: DateTime<Utc>) -> Self {
        let status = if now < record.end {
            PoolStatus::Active
        } else {
            PoolStatus::Ended
        };
        Self {
            title: record.title.clone(),
            status,
            remaining: remaining_time(record.end, now),
            ballot_box_id: record.ballot_box_id.clone(),
        }
    }
}

/// Everything the page renders, one variant per screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum GateView {
    ConnectWallet,
    NotFound {
        pool_id: PoolId,
    },
    Loading {
        pool_id: PoolId,
    },
    Public {
        header: PoolHeader,
        content: Option<BallotContent>,
        error: Option<String>,
    },
    /// Sign button; disabled while `signing`.
    Locked {
        header: PoolHeader,
        signing: bool,
        error: Option<String>,
    },
    Unlocked {
        header: PoolHeader,
        decrypting: bool,
        content: Option<BallotContent>,
        error: Option<String>,
    },
}

impl GateView {
    pub fn project(model: &GateModel, now: DateTime<Utc>) -> Self {
        if model.account().is_none() {
            return GateView::ConnectWallet;
        }

        let phase = model.phase(now);
        let error = model
            .last_error(now)
            .filter(|e| e.is_user_visible())
            .map(|e| e.to_string());
        let content = model.casting(now).map(|c| c.content.clone());

        let header = match (phase, model.record()) {
            (GatePhase::NotFound, _) => {
                return GateView::NotFound {
                    pool_id: model.pool_id().clone(),
                }
            }
            (_, None) => {
                return GateView::Loading {
                    pool_id: model.pool_id().clone(),
                }
            }
            (_, Some(record)) => PoolHeader::new(record, now),
        };

        match phase {
            GatePhase::PublicView => GateView::Public {
                header,
                content,
                error,
            },
            GatePhase::GatedLocked => GateView::Locked {
                header,
                signing: model.tasks.signing.is_in_progress(),
                error,
            },
            GatePhase::GatedUnlocked => GateView::Unlocked {
                header,
                decrypting: model.tasks.decrypt.is_in_progress(),
                content,
                error,
            },
            GatePhase::Unresolved | GatePhase::NotFound => GateView::Loading {
                pool_id: model.pool_id().clone(),
            },
        }
    }
}

/// "2d 3h left", "3h 12m left", "12m left", "less than a minute left" or "ended".
pub fn remaining_time(end: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = end - now;
    if left <= Duration::zero() {
        return "ended".to_string();
    }
    let days = left.num_days();
    let hours = left.num_hours() % 24;
    let minutes = left.num_minutes() % 60;
    if days > 0 {
        format!("{days}d {hours}h left")
    } else if hours > 0 {
        format!("{hours}h {minutes}m left")
    } else if minutes > 0 {
        format!("{minutes}m left")
    } else {
        "less than a minute left".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GateEvent;
    use crate::gate::GateSettings;
    use crate::types::{Address, Visibility};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn remaining_time_labels() {
        let now = t0();
        assert_eq!(
            remaining_time(now + Duration::days(2) + Duration::hours(3), now),
            "2d 3h left"
        );
        assert_eq!(
            remaining_time(now + Duration::hours(3) + Duration::minutes(12), now),
            "3h 12m left"
        );
        assert_eq!(remaining_time(now + Duration::minutes(12), now), "12m left");
        assert_eq!(
            remaining_time(now + Duration::seconds(30), now),
            "less than a minute left"
        );
        assert_eq!(remaining_time(now, now), "ended");
        assert_eq!(remaining_time(now - Duration::hours(1), now), "ended");
    }

    #[test]
    fn no_account_asks_to_connect() {
        let model = GateModel::new(PoolId::from("v1"), None, GateSettings::default());
        assert_eq!(GateView::project(&model, t0()), GateView::ConnectWallet);
    }

    #[test]
    fn locked_view_serializes_with_tag() {
        let mut model = GateModel::new(
            PoolId::from("v2"),
            Some(Address::from("0xABC")),
            GateSettings::default(),
        );
        model.handle_event(GateEvent::Mounted, t0());
        let ctx = model.take_commands()[0].context().clone();
        model.handle_event(
            GateEvent::FetchCompleted {
                ctx,
                result: Ok(Some(VotePoolRecord {
                    id: PoolId::from("v2"),
                    title: "Budget".into(),
                    end: t0() - Duration::minutes(1),
                    visibility: Visibility::Gated,
                    ballot_box_id: BallotBoxId::from("box-2"),
                    details: "sealed:v2".into(),
                })),
            },
            t0(),
        );
        assert_eq!(
            GateView::project(&model, t0()),
            GateView::Locked {
                header: PoolHeader {
                    title: "Budget".into(),
                    status: PoolStatus::Ended,
                    remaining: "ended".into(),
                    ballot_box_id: BallotBoxId::from("box-2"),
                },
                signing: false,
                error: None,
            }
        );

        model.handle_event(GateEvent::SignRequested, t0());
        let json = serde_json::to_value(GateView::project(&model, t0())).unwrap();
        assert_eq!(json["view"], "locked");
        assert_eq!(json["signing"], true);
        assert_eq!(json["header"]["status"], "ended");
        assert_eq!(json["header"]["remaining"], "ended");
    }
}
