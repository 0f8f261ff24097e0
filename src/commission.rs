//! Commission arithmetic and the form that keeps its amount in sync.
//!
//! | type           | formula                                           |
//! |----------------|---------------------------------------------------|
//! | Placement      | placement_fee × commission_rate / 100             |
//! | Contract       | (client_rate − contractor_rate) × commission_rate / 100 |
//! | Team Interview | source_fee × stage_percentage / 100               |
//!
//! Inputs are raw form text. Anything that does not parse counts as zero and
//! negative results clamp to zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Commission, CommissionType};

/// Raw field values as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionInputs {
    pub placement_fee: Option<String>,
    pub client_rate: Option<String>,
    pub contractor_rate: Option<String>,
    pub source_fee: Option<String>,
    pub stage_percentage: Option<String>,
    pub commission_rate: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionField {
    PlacementFee,
    ClientRate,
    ContractorRate,
    SourceFee,
    StagePercentage,
    CommissionRate,
}

impl CommissionInputs {
    fn slot(&mut self, field: CommissionField) -> &mut Option<String> {
        match field {
            CommissionField::PlacementFee => &mut self.placement_fee,
            CommissionField::ClientRate => &mut self.client_rate,
            CommissionField::ContractorRate => &mut self.contractor_rate,
            CommissionField::SourceFee => &mut self.source_fee,
            CommissionField::StagePercentage => &mut self.stage_percentage,
            CommissionField::CommissionRate => &mut self.commission_rate,
        }
    }
}

/// Lenient number parsing: `$1,250.50`, `20%` and ` 12 ` all work; anything else is 0.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '€' | '£'))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn calculate(commission_type: CommissionType, inputs: &CommissionInputs) -> f64 {
    let n = |v: &Option<String>| parse_amount(v.as_deref());
    let raw = match commission_type {
        CommissionType::Placement => n(&inputs.placement_fee) * n(&inputs.commission_rate) / 100.0,
        CommissionType::Contract => {
            (n(&inputs.client_rate) - n(&inputs.contractor_rate)) * n(&inputs.commission_rate) / 100.0
        }
        CommissionType::TeamInterview => {
            n(&inputs.source_fee) * n(&inputs.stage_percentage) / 100.0
        }
    };
    round_cents(raw.max(0.0))
}

/// Commission entry form. The amount is recomputed on every edit.
#[derive(Debug, Clone)]
pub struct CommissionForm {
    commission_type: CommissionType,
    inputs: CommissionInputs,
    amount: f64,
}

impl CommissionForm {
    pub fn new(commission_type: CommissionType) -> Self {
        Self::with_inputs(commission_type, CommissionInputs::default())
    }

    pub fn with_inputs(commission_type: CommissionType, inputs: CommissionInputs) -> Self {
        let amount = calculate(commission_type, &inputs);
        Self {
            commission_type,
            inputs,
            amount,
        }
    }

    pub fn set(&mut self, field: CommissionField, value: &str) {
        let value = value.trim();
        *self.inputs.slot(field) = (!value.is_empty()).then(|| value.to_string());
        self.recompute();
    }

    pub fn set_type(&mut self, commission_type: CommissionType) {
        self.commission_type = commission_type;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.amount = calculate(self.commission_type, &self.inputs);
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn commission_type(&self) -> CommissionType {
        self.commission_type
    }

    pub fn inputs(&self) -> &CommissionInputs {
        &self.inputs
    }

    /// Persists the record with a freshly computed amount.
    pub fn submit(
        &self,
        db: &Database,
        recruiter_id: i64,
        position_id: i64,
        candidate_id: i64,
    ) -> Result<i64> {
        db.get_recruiter(recruiter_id)?
            .ok_or_else(|| AppError::NotFound(format!("recruiter #{}", recruiter_id)))?;
        db.get_position(position_id)?
            .ok_or_else(|| AppError::NotFound(format!("position #{}", position_id)))?;
        db.get_candidate(candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate #{}", candidate_id)))?;

        let amount = calculate(self.commission_type, &self.inputs);
        let id = db.insert_commission(
            recruiter_id,
            position_id,
            candidate_id,
            self.commission_type,
            &self.inputs,
            amount,
        )?;
        info!(commission_id = id, recruiter_id, %amount, kind = %self.commission_type, "commission recorded");
        Ok(id)
    }
}

/// Total payout per recruiter id.
pub fn totals_by_recruiter(commissions: &[Commission]) -> BTreeMap<i64, f64> {
    let mut totals = BTreeMap::new();
    for c in commissions {
        *totals.entry(c.recruiter_id).or_insert(0.0) += c.amount;
    }
    for total in totals.values_mut() {
        *total = round_cents(*total);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;

    fn inputs(pairs: &[(CommissionField, &str)]) -> CommissionInputs {
        let mut inputs = CommissionInputs::default();
        for (field, value) in pairs {
            *inputs.slot(*field) = Some(value.to_string());
        }
        inputs
    }

    #[test]
    fn test_contract_scenario() {
        let i = inputs(&[
            (CommissionField::ClientRate, "100"),
            (CommissionField::ContractorRate, "60"),
            (CommissionField::CommissionRate, "20"),
        ]);
        assert_eq!(calculate(CommissionType::Contract, &i), 8.0);
    }

    #[test]
    fn test_placement_and_team_interview_formulas() {
        let p = inputs(&[
            (CommissionField::PlacementFee, "$25,000"),
            (CommissionField::CommissionRate, "12.5%"),
        ]);
        assert_eq!(calculate(CommissionType::Placement, &p), 3125.0);

        let t = inputs(&[
            (CommissionField::SourceFee, "1500"),
            (CommissionField::StagePercentage, "33"),
        ]);
        assert_eq!(calculate(CommissionType::TeamInterview, &t), 495.0);
    }

    #[test]
    fn test_negative_margin_clamps_to_zero() {
        let i = inputs(&[
            (CommissionField::ClientRate, "50"),
            (CommissionField::ContractorRate, "80"),
            (CommissionField::CommissionRate, "20"),
        ]);
        assert_eq!(calculate(CommissionType::Contract, &i), 0.0);
    }

    #[test]
    fn test_malformed_and_empty_inputs_are_zero_never_negative() {
        let samples = ["", "abc", "-5", "1e400", "NaN", "12..3", "  ", "-100%"];
        for a in samples {
            for b in samples {
                let i = inputs(&[
                    (CommissionField::PlacementFee, a),
                    (CommissionField::ClientRate, a),
                    (CommissionField::ContractorRate, b),
                    (CommissionField::SourceFee, b),
                    (CommissionField::StagePercentage, a),
                    (CommissionField::CommissionRate, b),
                ]);
                for t in CommissionType::ALL {
                    assert!(calculate(*t, &i) >= 0.0, "{} {:?} {:?}", t, a, b);
                }
            }
        }
        assert_eq!(calculate(CommissionType::Placement, &CommissionInputs::default()), 0.0);
    }

    #[test]
    fn test_form_recomputes_on_every_edit() {
        let mut form = CommissionForm::new(CommissionType::Placement);
        assert_eq!(form.amount(), 0.0);
        form.set(CommissionField::PlacementFee, "10000");
        assert_eq!(form.amount(), 0.0);
        form.set(CommissionField::CommissionRate, "10");
        assert_eq!(form.amount(), 1000.0);
        form.set(CommissionField::CommissionRate, "");
        assert_eq!(form.amount(), 0.0);
        assert_eq!(form.inputs().commission_rate, None);

        form.set(CommissionField::CommissionRate, "10");
        form.set_type(CommissionType::TeamInterview);
        assert_eq!(form.amount(), 0.0);
    }

    #[test]
    fn test_submit_stores_fresh_amount() {
        let f = fixture();
        let mut form = CommissionForm::new(CommissionType::Contract);
        form.set(CommissionField::ClientRate, "100");
        form.set(CommissionField::ContractorRate, "60");
        form.set(CommissionField::CommissionRate, "20");
        form.submit(&f.db, f.recruiter_id, f.position_id, f.candidate_id).unwrap();

        let stored = f.db.list_commissions(Some(f.recruiter_id)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, 8.0);
        let recomputed = calculate(
            stored[0].commission_type,
            &CommissionInputs {
                placement_fee: stored[0].placement_fee.clone(),
                client_rate: stored[0].client_rate.clone(),
                contractor_rate: stored[0].contractor_rate.clone(),
                source_fee: stored[0].source_fee.clone(),
                stage_percentage: stored[0].stage_percentage.clone(),
                commission_rate: stored[0].commission_rate.clone(),
            },
        );
        assert_eq!(stored[0].amount, recomputed);
    }

    #[test]
    fn test_submit_requires_existing_records() {
        let f = fixture();
        let form = CommissionForm::new(CommissionType::Placement);
        assert!(form.submit(&f.db, 999, f.position_id, f.candidate_id).is_err());
        assert!(f.db.list_commissions(None).unwrap().is_empty());
    }
}
