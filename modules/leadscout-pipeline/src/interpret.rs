//! Query interpretation and per-lead sales analysis through the summarizer.
//!
//! Both degrade gracefully: with no summarizer, or output that does not parse,
//! interpretation falls back to the raw query and analysis is skipped.

use ai_client::extract_json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use leadscout_common::{Lead, LeadAnalysis, Platform};

use crate::providers::Summarizer;

pub const DEFAULT_LOCATION: &str = "España";
pub const DEFAULT_ROLES: &[&str] = &["CEO", "Founder", "Owner", "Propietario", "Director"];

const INTERPRET_SYSTEM: &str = r#"You are a B2B prospecting expert. The user wants to find business leads.
Interpret the search and produce the best terms to find OWNERS and DECISION-MAKERS of companies.

Respond ONLY with valid JSON in exactly this format:
{
  "searchQuery": "optimized term for the target platform",
  "industry": "detected sector/industry",
  "targetRoles": ["roles to look for, in Spanish and English"],
  "location": "geographic location, España by default"
}"#;

const ANALYSIS_SYSTEM: &str = r#"You are an expert B2B prospecting analyst. Produce a COMPLETE sales analysis of the lead.

Respond ONLY with valid JSON:
{
  "summary": "who this company/person is, in 2 sentences",
  "opportunity": "why it could be a good prospect",
  "painPoints": ["2-3 problems this kind of business likely has"],
  "bottleneck": "the main obstacle it faces",
  "entryAngle": "how to open the conversation"
}
Be concise. 150 words maximum in total."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedQuery {
    pub search_query: String,
    pub industry: String,
    pub target_roles: Vec<String>,
    pub location: String,
}

impl InterpretedQuery {
    /// Interpretation used when no summarizer is available or it fails.
    pub fn fallback(query: &str) -> Self {
        Self {
            search_query: query.trim().to_string(),
            industry: query.trim().to_string(),
            target_roles: DEFAULT_ROLES.iter().map(|r| r.to_string()).collect(),
            location: DEFAULT_LOCATION.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInterpretation {
    search_query: Option<String>,
    industry: Option<String>,
    #[serde(default)]
    target_roles: Vec<String>,
    location: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Turn a free-text query into platform search terms.
pub async fn interpret_query(
    summarizer: Option<&dyn Summarizer>,
    query: &str,
    platform: Platform,
) -> InterpretedQuery {
    let fallback = InterpretedQuery::fallback(query);
    let Some(summarizer) = summarizer else {
        return fallback;
    };

    let platform_name = match platform {
        Platform::Maps => "Google Maps",
        Platform::LinkedIn => "LinkedIn",
    };
    let user = format!("Platform: {platform_name}\nInterpret this lead search: \"{query}\"");

    let raw = match summarizer.complete(INTERPRET_SYSTEM, &user).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Query interpretation failed, using raw query");
            return fallback;
        }
    };

    let Some(parsed) = extract_json(&raw)
        .and_then(|v| serde_json::from_value::<RawInterpretation>(v).ok())
    else {
        warn!("Query interpretation returned no usable JSON, using raw query");
        return fallback;
    };

    let roles: Vec<String> = parsed
        .target_roles
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    let interpreted = InterpretedQuery {
        search_query: non_blank(parsed.search_query).unwrap_or(fallback.search_query),
        industry: non_blank(parsed.industry).unwrap_or(fallback.industry),
        target_roles: if roles.is_empty() { fallback.target_roles } else { roles },
        location: non_blank(parsed.location).unwrap_or(fallback.location),
    };
    debug!(?interpreted, "Query interpreted");
    interpreted
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    opportunity: String,
    #[serde(default)]
    pain_points: Vec<String>,
    #[serde(default)]
    bottleneck: String,
    #[serde(default)]
    entry_angle: String,
}

fn lead_context(lead: &Lead) -> String {
    let or_na = |v: Option<&str>| v.filter(|s| !s.is_empty()).unwrap_or("not available").to_string();
    format!(
        "Company: {}\nLocation: {}\nWebsite: {}\nDecision-maker: {} - {}\nLinkedIn: {}\nEmail: {}\nPhone: {}\nPrior summary: {}",
        lead.company_name(),
        or_na(Some(lead.entity.location.as_str())),
        or_na(lead.website()),
        or_na(Some(lead.contact.name.as_str())),
        or_na(Some(lead.contact.role.as_str())),
        or_na(lead.contact.linkedin.as_deref()),
        or_na(lead.contact.email.as_deref()),
        or_na(lead.contact.phone.as_deref()),
        lead.summary,
    )
}

/// Short sales analysis for one lead. `None` when the summarizer fails or its
/// output does not parse; the caller keeps the lead's prior summary.
pub async fn analyze_lead(summarizer: &dyn Summarizer, lead: &Lead) -> Option<LeadAnalysis> {
    let user = format!("Analyze this lead:\n{}", lead_context(lead));
    let raw = match summarizer.complete(ANALYSIS_SYSTEM, &user).await {
        Ok(text) => text,
        Err(e) => {
            warn!(company = lead.company_name(), error = %e, "Lead analysis failed");
            return None;
        }
    };
    let parsed: RawAnalysis = serde_json::from_value(extract_json(&raw)?).ok()?;
    if parsed.summary.trim().is_empty() {
        return None;
    }
    Some(LeadAnalysis {
        summary: parsed.summary,
        opportunity: parsed.opportunity,
        pain_points: parsed.pain_points,
        bottleneck: parsed.bottleneck,
        entry_angle: parsed.entry_angle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSummarizer;
    use leadscout_common::Entity;

    #[tokio::test]
    async fn no_summarizer_falls_back() {
        let q = interpret_query(None, "gimnasios", Platform::Maps).await;
        assert_eq!(q.search_query, "gimnasios");
        assert_eq!(q.industry, "gimnasios");
        assert_eq!(q.location, "España");
        assert_eq!(q.target_roles, vec!["CEO", "Founder", "Owner", "Propietario", "Director"]);
    }

    #[tokio::test]
    async fn parses_fenced_json_and_fills_gaps() {
        let summarizer = MockSummarizer::new().on_system_containing(
            "B2B prospecting expert",
            "```json\n{\"searchQuery\": \"gimnasio boutique\", \"industry\": \"Fitness\", \"targetRoles\": []}\n```",
        );
        let q = interpret_query(Some(&summarizer as &dyn Summarizer), "gimnasios", Platform::Maps).await;
        assert_eq!(q.search_query, "gimnasio boutique");
        assert_eq!(q.industry, "Fitness");
        assert_eq!(q.target_roles.len(), 5);
        assert_eq!(q.location, "España");
    }

    #[tokio::test]
    async fn garbage_output_falls_back() {
        let summarizer = MockSummarizer::new().on_system_containing("B2B prospecting expert", "no idea");
        let q = interpret_query(Some(&summarizer as &dyn Summarizer), "dentistas", Platform::LinkedIn).await;
        assert_eq!(q, InterpretedQuery::fallback("dentistas"));
    }

    #[tokio::test]
    async fn analysis_parsed_or_none() {
        let lead = Lead::new(Entity::new("Acme Gym"), Platform::Maps);
        let good = MockSummarizer::new().on_system_containing(
            "sales analysis",
            r#"{"summary": "Gym in Madrid", "painPoints": ["churn"], "entryAngle": "retention"}"#,
        );
        let analysis = analyze_lead(&good, &lead).await.unwrap();
        assert_eq!(analysis.summary, "Gym in Madrid");
        assert_eq!(analysis.pain_points, vec!["churn"]);
        assert_eq!(analysis.entry_angle, "retention");

        let failing = MockSummarizer::new();
        assert!(analyze_lead(&failing, &lead).await.is_none());
    }
}
