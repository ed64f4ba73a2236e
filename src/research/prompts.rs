//! Prompt composition for the two pipeline stages.
//!
//! Every function here is pure: identical input produces byte-identical
//! output. The templates are frozen constants; section order is part of the
//! contract and covered by tests.

use super::evidence::Evidence;

/// System instruction for the research stage.
pub const RESEARCH_ANALYST_ROLE: &str =
    "You are a professional research analyst from a top consulting firm.";

/// System instruction for the report-composition stage.
pub const REPORT_AUTHOR_ROLE: &str =
    "You are a senior consultant writing a professional report.";

const RESEARCH_INSTRUCTION: &str =
    "Analyze the following research material and synthesize key findings:";

const DOCUMENT_SECTION_HEADER: &str = "Here are some relevant documents to consider:";

const ANALYSIS_FOCUS: &str = "Focus on:\n\
1. Key trends and patterns\n\
2. Market dynamics\n\
3. Critical insights\n\
4. Data points and statistics\n\
5. Expert opinions and analysis\n\
\n\
Provide a comprehensive analysis that can be used for a professional report.";

const REPORT_INSTRUCTION: &str =
    "Create a professional consulting report based on the following research:";

const REPORT_TEMPLATE: &str = "Format the report with:\n\
1. Executive Summary\n\
2. Key Findings\n\
3. Detailed Analysis\n\
4. Market Implications\n\
5. Recommendations\n\
6. Conclusion\n\
7. References with citations and url if available";

const REPORT_CONSTRAINTS: &str = "Instructions:\n\
- Include specific data points and insights.\n\
- Make it actionable and valuable for decision-makers.\n\
- The report format is in markdown and intended to be used in a PDF document.\n\
- Don't include headers like Date, To, From, etc.\n\
- Don't include any headers like ```markdown";

/// Prompt templates for the report pipeline.
pub struct ReportPrompts;

impl ReportPrompts {
    /// Research-stage prompt: role instruction, then document text (section
    /// omitted when every document is empty), then search results as fixed
    /// `URL:`/`Content:` blocks in input order, then the analysis focus.
    pub fn research_prompt(evidence: &Evidence) -> String {
        let mut prompt = String::from(RESEARCH_INSTRUCTION);
        prompt.push_str("\n\n");

        let documents: Vec<&str> = evidence
            .document_text
            .iter()
            .filter(|text| !text.is_empty())
            .map(|text| text.as_str())
            .collect();
        if !documents.is_empty() {
            prompt.push_str(DOCUMENT_SECTION_HEADER);
            prompt.push_str("\n\n");
            prompt.push_str(&documents.join("\n\n"));
            prompt.push_str("\n\n");
        }

        if !evidence.search_results.is_empty() {
            let blocks: Vec<String> = evidence
                .search_results
                .iter()
                .map(|result| format!("URL: {}\nContent: {}", result.url, result.content))
                .collect();
            prompt.push_str(&blocks.join("\n\n"));
            prompt.push_str("\n\n");
        }

        prompt.push_str(ANALYSIS_FOCUS);
        prompt
    }

    /// Report-stage prompt: authoring instruction, the findings, the
    /// caller-supplied report type, the structural template, and the
    /// formatting constraints.
    pub fn report_prompt(research_findings: &str, report_type: &str) -> String {
        format!(
            "{REPORT_INSTRUCTION}\n\n{research_findings}\n\nReport Type: {report_type}\n\n\
             {REPORT_TEMPLATE}\n\n{REPORT_CONSTRAINTS}"
        )
    }
}
