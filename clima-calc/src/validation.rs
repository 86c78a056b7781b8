//! Attention-check validation

use crate::error::{CalcError, CalcResult};
use crate::instrument::{AttentionCheck, CampaignData};
use crate::store::SurveyStore;
use clima_common::db::Respondent;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Respondents that answered and passed every check
    pub valid: Vec<Respondent>,
    /// Ids of respondents marked disqualified during this run
    pub disqualified: Vec<String>,
}

/// First check the answers fail, if any. A missing answer fails.
pub fn failed_check<'a>(
    checks: &'a [AttentionCheck],
    answers: &HashMap<String, i64>,
) -> Option<&'a AttentionCheck> {
    checks
        .iter()
        .find(|check| answers.get(&check.item_id) != Some(&check.expected_score))
}

/// Split completed respondents into valid and disqualified
///
/// Each failing respondent is marked disqualified in the store before the
/// next one is examined. Respondents without any response are skipped.
pub async fn validate_respondents(
    store: &dyn SurveyStore,
    data: &CampaignData,
) -> CalcResult<ValidationOutcome> {
    let checks = &data.instrument.attention_checks;
    let mut outcome = ValidationOutcome::default();
    let mut skipped = 0usize;

    for respondent in &data.respondents {
        let Some(answers) = data.responses.get(&respondent.id) else {
            skipped += 1;
            continue;
        };

        match failed_check(checks, answers) {
            None => outcome.valid.push(respondent.clone()),
            Some(check) => {
                warn!(
                    "Disqualifying respondent {}: attention check {} expected {}, got {:?}",
                    respondent.id,
                    check.item_id,
                    check.expected_score,
                    answers.get(&check.item_id)
                );
                store.mark_disqualified(&respondent.id).await?;
                outcome.disqualified.push(respondent.id.clone());
            }
        }
    }

    info!(
        "Validation: {} valid, {} disqualified, {} without responses",
        outcome.valid.len(),
        outcome.disqualified.len(),
        skipped
    );

    if outcome.valid.is_empty() {
        return Err(CalcError::AllDisqualified {
            disqualified: outcome.disqualified.len(),
        });
    }

    Ok(outcome)
}
