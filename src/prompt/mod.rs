//! Layered system prompt assembly.
//!
//! Every chat turn gets a prompt built from fixed layers: business
//! persona, tenant configuration, tone instruction, hard grounding
//! rules, then the per-turn record context and attached documents.
//! The assembler only ever sees sanitized text.

use crate::context::{ContextBlock, DocumentContext};
use crate::models::{Tone, Vertical};
use crate::tenant::TenantRecord;

struct Persona {
    role: &'static str,
    domain: &'static str,
    rules: &'static [&'static str],
}

const IT_LAB_PERSONA: Persona = Persona {
    role: "Expert IT Technician and Systems Engineer",
    domain: "hardware diagnostics, software troubleshooting, network configuration, \
             OS administration (Windows / Linux), cybersecurity, and device lifecycle management",
    rules: &[
        "Always reference the exact hardware specs from the Active Record when diagnosing issues.",
        "Prefix any action that risks data loss with \u{26a0}\u{fe0f} WARNING.",
        "Suggest the least-invasive solution first, then escalate.",
        "If a spec is missing from the record, say so, do not guess.",
        "Format multi-step procedures as a numbered list.",
    ],
};

const LAW_FIRM_PERSONA: Persona = Persona {
    role: "Expert Israeli Legal Research Assistant",
    domain: "Israeli civil and commercial law, legal procedures, \
             case management, document drafting, and court processes",
    rules: &[
        "Be extremely direct and concise. Avoid formal greetings and boilerplate openings \
         (e.g., do NOT start with '\u{05dc}\u{05e7}\u{05d5}\u{05d7}\u{05d4} \u{05e0}\u{05db}\u{05d1}\u{05d3}\u{05d4}').",
        "Get straight to the point and answer the question immediately based on the data.",
        "Cite relevant Israeli law codes or Supreme Court precedents where applicable.",
        "Clearly distinguish between established legal facts and your analysis.",
        "Use formal, precise legal terminology in both Hebrew and English as appropriate.",
    ],
};

const CAFE_PERSONA: Persona = Persona {
    role: "Experienced Cafe Manager and Head Barista",
    domain: "coffee preparation, Israeli cafe culture, menu management, \
             inventory and pricing, kosher dietary compliance, and customer service",
    rules: &[
        // Sachlav is a drink on this menu, not the orchid plant the word
        // also names. Models keep getting this wrong without the rule.
        "IMPORTANT \u{2014} Sachlav (\u{05e1}\u{05d7}\u{05dc}\u{05d1}): In THIS cafe context, Sachlav is a warm sweet \
         milk beverage thickened with orchid-root starch powder. It is NOT about orchid plants. \
         Always refer to it as a drink.",
        "Always consider Israeli kashrut (kosher) rules when recommending ingredients.",
        "Provide practical, immediately actionable advice.",
        "If a product is unavailable (is_available = false), say so before suggesting it.",
        "Use warm, friendly language, this is a hospitality context.",
    ],
};

/// Grounding rules applied to every vertical.
const GROUNDING_RULES: &[&str] = &[
    "ONLY use information explicitly provided in the sections below.",
    "If a fact is not present in the provided context, respond with: \
     'I don't have that information in the current record.'",
    "Do NOT use generic placeholders or boilerplate text.",
    "NEVER invent names, phone numbers, dates, prices, or technical specs.",
    "NEVER extrapolate beyond what the data says.",
];

fn persona_for(vertical: Vertical) -> &'static Persona {
    match vertical {
        Vertical::ItLab => &IT_LAB_PERSONA,
        Vertical::LawFirm => &LAW_FIRM_PERSONA,
        Vertical::Cafe => &CAFE_PERSONA,
    }
}

fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Communicate in a professional, precise, and formal tone.",
        Tone::Friendly => "Communicate in a warm, friendly, and approachable tone.",
        Tone::Technical => {
            "Communicate in a highly technical, detailed, and exact manner with minimal filler."
        }
        Tone::Casual => "Communicate in a relaxed, conversational, and easy-going tone.",
    }
}

/// Stateless prompt builder. Tenant data arrives pre-authenticated via
/// the guard, so there is no config fetching here.
pub struct PromptAssembler;

impl PromptAssembler {
    pub fn new() -> Self {
        Self
    }

    /// The persistent identity layer for the model's system instruction.
    pub fn build_system_instruction(
        &self,
        vertical: Vertical,
        tenant: &TenantRecord,
        tone: Tone,
    ) -> String {
        let persona = persona_for(vertical);

        let mut rules = String::new();
        for rule in GROUNDING_RULES.iter().chain(persona.rules.iter()) {
            rules.push_str(&format!("- {rule}\n"));
        }

        let mut sections = vec![
            format!(
                "# IDENTITY\nYou are a **{}** working exclusively for **{}**.\nYour area of expertise: {}.",
                persona.role, tenant.business_name, persona.domain
            ),
            format!("# TONE\n{}", tone_instruction(tone)),
            format!("# RULES (NON-NEGOTIABLE)\n{}", rules.trim_end()),
        ];

        if !tenant.custom_policy.trim().is_empty() {
            sections.push(format!(
                "# CUSTOM BUSINESS POLICIES\n{}",
                tenant.custom_policy.trim()
            ));
        }

        sections.push(
            "# YOUR TASK\n\
             Answer using ONLY the provided Record Context and Attached Documents. \
             Be extremely direct. If you cannot find an answer in the data, say so."
                .to_string(),
        );

        sections.join("\n\n")
    }

    /// The per-turn data layer: active record plus attached documents,
    /// followed by the (sanitized) user query.
    pub fn build_user_turn(
        &self,
        record_context: Option<&ContextBlock>,
        documents: &[DocumentContext],
        sanitized_query: &str,
    ) -> String {
        let mut sections = Vec::new();

        match record_context {
            Some(block) => {
                sections.push(format!("# ACTIVE RECORD CONTEXT\n{}", block.format_for_prompt()))
            }
            None => sections.push("# ACTIVE RECORD CONTEXT\nNo record selected.".to_string()),
        }

        if documents.is_empty() {
            sections.push("# ATTACHED DOCUMENTS\nNo documents available.".to_string());
        } else {
            let docs = documents
                .iter()
                .map(|d| format!("## File: {}\n{}", d.filename, d.sanitized_text))
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("# ATTACHED DOCUMENTS\n{docs}"));
        }

        sections.push(format!("# USER QUERY\n{sanitized_query}"));

        sections.join("\n\n")
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}
