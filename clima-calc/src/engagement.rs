//! Engagement profiles and eNPS

use crate::results::{EngagementProfiles, EngagementResult, EnpsResult, ScoreSummary, Share};
use crate::scoring::RespondentScores;
use crate::stats::{self, round_half_up};
use serde::{Deserialize, Serialize};

/// eNPS scores at or above this are promoters
pub const PROMOTER_MIN: i64 = 9;
/// eNPS scores at or below this are detractors
pub const DETRACTOR_MAX: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Ambassador,
    Committed,
    Neutral,
    Disengaged,
}

/// Classify a respondent by the mean of all their adjusted scores
pub fn classify(mean: f64) -> Profile {
    if mean >= 4.5 {
        Profile::Ambassador
    } else if mean >= 4.0 {
        Profile::Committed
    } else if mean >= 3.0 {
        Profile::Neutral
    } else {
        Profile::Disengaged
    }
}

/// Engagement row over respondents with at least one score
///
/// Favorability counts respondents whose mean rounds to 4 or more.
pub fn engagement_result(respondents: &[RespondentScores]) -> Option<EngagementResult> {
    let means: Vec<f64> = respondents.iter().filter_map(RespondentScores::overall_mean).collect();
    if means.is_empty() {
        return None;
    }

    let (mut ambassadors, mut committed, mut neutral, mut disengaged) = (0, 0, 0, 0);
    for &mean in &means {
        match classify(mean) {
            Profile::Ambassador => ambassadors += 1,
            Profile::Committed => committed += 1,
            Profile::Neutral => neutral += 1,
            Profile::Disengaged => disengaged += 1,
        }
    }

    let total = means.len();
    let rounded: Vec<f64> = means.iter().map(|&m| round_half_up(m, 0)).collect();

    Some(EngagementResult {
        summary: ScoreSummary {
            avg_score: round_half_up(stats::mean(&means), 2),
            std_score: round_half_up(stats::std_dev(&means), 2),
            favorability_pct: round_half_up(stats::favorability(&rounded), 1),
            response_count: total,
            respondent_count: total,
        },
        profiles: EngagementProfiles {
            ambassadors: Share::of(ambassadors, total),
            committed: Share::of(committed, total),
            neutral: Share::of(neutral, total),
            disengaged: Share::of(disengaged, total),
        },
    })
}

/// eNPS over respondents that gave a 0-10 score; `None` when nobody did
pub fn enps_result(respondents: &[RespondentScores]) -> Option<EnpsResult> {
    let scores: Vec<i64> = respondents
        .iter()
        .filter_map(|r| r.respondent.enps_score)
        .collect();
    if scores.is_empty() {
        return None;
    }

    let total = scores.len();
    let promoters = scores.iter().filter(|&&s| s >= PROMOTER_MIN).count();
    let detractors = scores.iter().filter(|&&s| s <= DETRACTOR_MAX).count();
    let passives = total - promoters - detractors;
    let enps = round_half_up((promoters as f64 - detractors as f64) / total as f64 * 100.0, 0);

    Some(EnpsResult {
        enps: enps as i64,
        total,
        promoters: Share::of(promoters, total),
        passives: Share::of(passives, total),
        detractors: Share::of(detractors, total),
    })
}
