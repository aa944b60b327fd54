use anyhow::{ensure, Context};
use serde::Serialize;

pub const SPENDING_OPTIONS: [&str; 6] = ["Shopping", "Fuel", "Travel", "Dining", "Online", "Bills"];
pub const BENEFIT_OPTIONS: [&str; 4] = ["Cashback", "Rewards", "Lounge Access", "EMI"];

/// Financial profile submitted for a single recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    monthly_income: u64,
    spending_categories: Vec<String>,
    desired_benefits: Vec<String>,
}

impl UserProfile {
    pub fn try_new<S, B>(monthly_income: i64, spending: S, benefits: B) -> anyhow::Result<Self>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        ensure!(
            monthly_income > 0,
            "monthly income must be positive (got {monthly_income})"
        );

        Ok(Self {
            monthly_income: monthly_income as u64,
            spending_categories: normalize_choices(spending),
            desired_benefits: normalize_choices(benefits),
        })
    }

    pub fn monthly_income(&self) -> u64 {
        self.monthly_income
    }

    pub fn spending_categories(&self) -> &[String] {
        &self.spending_categories
    }

    pub fn desired_benefits(&self) -> &[String] {
        &self.desired_benefits
    }
}

/// Parses the income field of the profile form.
pub fn parse_monthly_income(raw: &str) -> anyhow::Result<i64> {
    let raw = raw.trim();
    let income = raw
        .parse::<i64>()
        .with_context(|| format!("monthly income is not a number: {raw:?}"))?;
    ensure!(income > 0, "monthly income must be positive (got {income})");
    Ok(income)
}

/// Trims entries, drops blanks and keeps the first occurrence of each value
/// in the order the user picked them.
fn normalize_choices<I>(values: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let v = v.as_ref().trim();
        if !v.is_empty() && !out.iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}
