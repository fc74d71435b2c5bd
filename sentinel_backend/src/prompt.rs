//! System prompt composition.

/// Base rules every generated report follows.
pub const BASE_SYSTEM_PROMPT: &str = "\
You are Sentinel, an assistant specialized in technical report generation with strict requirements:

1. **Output Format**:
   - Use Markdown with clear section headers
   - Include risk assessments (Low/Medium/High)
   - Add confidence levels (1-5) for security findings
   - Format code blocks with language tags

2. **Content Rules**:
   - Never hallucinate information
   - Cite sources for all claims
   - Maintain neutral tone

3. **Error Handling**:
   - If uncertain, respond with: \"[UNCERTAIN] Need more context\"
   - For unsupported tasks: \"[REJECTED] Out of scope\"";

pub const ALERT_ANALYST_PROMPT: &str = "\
# Role: Security Sentinel
Output requirements:
1. Group findings by risk level
2. Include the original links
3. Provide mitigation advice";

pub const TRENDS_ANALYST_PROMPT: &str = "\
# Role: Hacker News Trend Analyst
Output requirements:
1. Categorize stories by technical field (AI, blockchain, security, ...)
2. Mark the heat of each story (🔥xN)
3. Add a short expert comment per category";

/// System prompt inputs for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSpec<'a> {
    pub base_prompt: &'a str,
    pub extra_instructions: Option<&'a str>,
}

impl PromptSpec<'_> {
    pub fn build(&self) -> String {
        build(self.base_prompt, self.extra_instructions)
    }
}

/// Merge `base` with an optional "Additional Instructions" section.
pub fn build(base: &str, extra: Option<&str>) -> String {
    match extra.map(str::trim).filter(|extra| !extra.is_empty()) {
        Some(extra) => format!("{}\n\nAdditional Instructions:\n{}", base, extra),
        None => base.to_string(),
    }
}

/// Join several optional addenda into one, skipping blanks.
pub fn join_instructions<'a, I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let joined = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_extra_returns_base() {
        assert_eq!(build("X", None), "X");
        assert_eq!(build("X", Some("   ")), "X");
    }

    #[test]
    fn build_with_extra_appends_delimited_section() {
        let prompt = build("X", Some("Y"));
        assert_eq!(prompt, "X\n\nAdditional Instructions:\nY");
        assert!(prompt.starts_with('X'));
    }

    #[test]
    fn role_prompt_follows_base_prompt() {
        let spec = PromptSpec {
            base_prompt: BASE_SYSTEM_PROMPT,
            extra_instructions: Some(ALERT_ANALYST_PROMPT),
        };
        let prompt = spec.build();
        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
        assert!(prompt.ends_with(ALERT_ANALYST_PROMPT));
    }

    #[test]
    fn join_instructions_skips_blank_parts() {
        assert_eq!(join_instructions([None, Some("  ")]), None);
        assert_eq!(
            join_instructions([Some("role"), None, Some("custom")]).as_deref(),
            Some("role\n\ncustom")
        );
    }
}
