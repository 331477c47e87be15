//! Splitting pool-level counts and budgets across zones
//!
//! Every share is either `⌊total/n⌋` or `⌈total/n⌉`, and the lower zone
//! indices take the remainder, so the per-zone values always sum back to the
//! pool value and the split only depends on the zone order.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use lattice_common::{Error, Result};

/// Share of `total` assigned to the zone at `zone_index` out of `zone_count`
///
/// A zone count of zero has no zones to receive anything and yields 0.
pub fn distribute_over_zones(zone_index: usize, total: u32, zone_count: usize) -> u32 {
    if zone_count == 0 {
        return 0;
    }
    let zone_count = u32::try_from(zone_count).unwrap_or(u32::MAX);
    let base = total / zone_count;
    let remainder = total % zone_count;
    if (zone_index as u64) < u64::from(remainder) {
        base + 1
    } else {
        base
    }
}

/// Which rolling-update budget is being resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetKind {
    /// Extra machines during a rollout, percentages of the pool maximum
    Surge,
    /// Missing machines during a rollout, percentages of the pool minimum
    Unavailable,
}

impl BudgetKind {
    /// Field name of the budget on the pool
    pub fn field_name(&self) -> &'static str {
        match self {
            BudgetKind::Surge => "maxSurge",
            BudgetKind::Unavailable => "maxUnavailable",
        }
    }

    /// Pool value percentages are taken of
    pub fn reference_total(&self, minimum: u32, maximum: u32) -> u32 {
        match self {
            BudgetKind::Surge => maximum,
            BudgetKind::Unavailable => minimum,
        }
    }

    fn rounds_up(&self) -> bool {
        matches!(self, BudgetKind::Surge)
    }
}

/// A validated rolling-update budget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Absolute number of machines
    Count(u32),
    /// Percentage (0 to 100) of the reference total
    Percent(u32),
}

impl Budget {
    /// Validate an `IntOrString` budget
    ///
    /// `field` is the full field path reported when the value is rejected.
    pub fn parse(value: &IntOrString, field: &str) -> Result<Self> {
        match value {
            IntOrString::Int(count) => u32::try_from(*count).map(Budget::Count).map_err(|_| {
                Error::configuration_field(
                    field,
                    format!("{field} must not be negative, got {count}"),
                )
            }),
            IntOrString::String(raw) => {
                let invalid = || {
                    Error::configuration_field(
                        field,
                        format!("invalid {field} {raw:?}, expected an integer or a percentage like \"25%\""),
                    )
                };
                let percent = raw
                    .trim()
                    .strip_suffix('%')
                    .ok_or_else(invalid)?
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid())?;
                if percent > 100 {
                    return Err(Error::configuration_field(
                        field,
                        format!("{field} percentage must be between 0% and 100%, got {raw:?}"),
                    ));
                }
                Ok(Budget::Percent(percent))
            }
        }
    }

    /// Pool-level budget for a reference total
    ///
    /// Surge percentages round up, unavailable percentages round down.
    pub fn resolve(&self, reference_total: u32, kind: BudgetKind) -> u32 {
        match *self {
            Budget::Count(count) => count,
            Budget::Percent(percent) => {
                let scaled = u64::from(percent) * u64::from(reference_total);
                let resolved = if kind.rounds_up() {
                    scaled.div_ceil(100)
                } else {
                    scaled / 100
                };
                // percent <= 100, so the result never exceeds reference_total
                u32::try_from(resolved).unwrap_or(reference_total)
            }
        }
    }
}

/// Share of a budget for the zone at `zone_index`
pub fn distribute_budget(
    zone_index: usize,
    budget: Budget,
    zone_count: usize,
    reference_total: u32,
    kind: BudgetKind,
) -> u32 {
    distribute_over_zones(zone_index, budget.resolve(reference_total, kind), zone_count)
}
