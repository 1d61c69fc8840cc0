//! The effects which interventions have on consumption.
//!
//! Each intervention type belongs to an [`InterventionCategory`], which selects how it modifies
//! the consumption of the target asset from the intervention year onwards.
use crate::id::InterventionTypeID;
use crate::pathway::{AssetRows, EndUseKey};
use crate::reference::{
    EfficiencyCoefficients, InterventionCategory, ReassignmentRule, ReferenceData,
};
use crate::units::Dimensionless;
use anyhow::Result;
use log::debug;
use std::rc::Rc;

/// Consumption of a single asset for each utility and end use, from the intervention year onwards
pub type AssetSlice = AssetRows<EndUseKey>;

/// A transformation of an asset's consumption
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Reduce consumption of each utility/end use by a proportion
    Efficiency(Rc<EfficiencyCoefficients>),
    /// Move consumption between utilities/end uses, applying rules in order
    RelativeReassignment(Rc<Vec<ReassignmentRule>>),
}

impl Effect {
    /// Get the effect for the given intervention type.
    ///
    /// Fails if the intervention type is unknown. If no parameters are configured for a known
    /// type, the effect leaves consumption unchanged.
    pub fn for_type(
        intervention_type: &InterventionTypeID,
        reference: &ReferenceData,
    ) -> Result<Self> {
        let effect = match reference.category(intervention_type)? {
            InterventionCategory::Efficiency => {
                Self::Efficiency(reference.efficiency_coefficients(intervention_type))
            }
            InterventionCategory::RelativeReassignment => {
                Self::RelativeReassignment(reference.reassignment_rules(intervention_type))
            }
        };

        if effect.is_identity() {
            debug!("No parameters configured for intervention type {intervention_type}");
        }

        Ok(effect)
    }

    /// Whether this effect leaves consumption unchanged because it has no parameters
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Efficiency(coefficients) => coefficients.is_empty(),
            Self::RelativeReassignment(rules) => rules.is_empty(),
        }
    }

    /// Apply the effect to an asset's consumption
    pub fn apply(&self, slice: AssetSlice) -> AssetSlice {
        match self {
            Self::Efficiency(coefficients) => apply_efficiency(coefficients, slice),
            Self::RelativeReassignment(rules) => apply_reassignment(rules, slice),
        }
    }
}

/// Scale each row by one minus its reduction coefficient.
///
/// Rows with no coefficient are unchanged.
fn apply_efficiency(coefficients: &EfficiencyCoefficients, mut slice: AssetSlice) -> AssetSlice {
    for (key, values) in &mut slice {
        let Some(reduction) = coefficients.get(key) else {
            continue;
        };
        let factor = Dimensionless(1.0) - *reduction;
        for value in values.iter_mut() {
            *value *= factor.0;
        }
    }

    slice
}

/// Move consumption according to each rule in turn.
///
/// The destination row is set to the source row divided by the CoP (creating it if needed) and the
/// source row is then zeroed. Where rules share a destination, later rules overwrite earlier ones.
/// Rules whose source row is absent are skipped.
fn apply_reassignment(rules: &[ReassignmentRule], mut slice: AssetSlice) -> AssetSlice {
    for rule in rules {
        let Some(source) = slice.get_mut(&rule.from) else {
            debug!(
                "Skipping reassignment from {}/{}: no consumption",
                rule.from.0, rule.from.1
            );
            continue;
        };
        let moved: Vec<f64> = source.iter().map(|value| value / rule.cop.0).collect();
        source.fill(0.0);
        slice.insert(rule.to.clone(), moved);
    }

    slice
}
