//! crates/drug_discovery_core/src/prompts.rs
//!
//! Prompt templates sent to the generative text endpoint.
//!
//! Every builder is a pure function of its inputs. Plain-text templates ask for
//! numbered `N. Heading:` lines followed by `-` bullets so the output can be fed
//! to [`crate::parsing::parse_sections`]; JSON templates ask for a single object
//! that [`crate::parsing::extract_json`] can pull out of the reply.

use crate::domain::Smiles;

const PLAIN_TEXT_CONTRACT: &str = r#"Format rules:
- Use numbered section headings exactly like "1. Heading Name:" on their own line.
- Heading names may only contain letters and spaces.
- Under each heading, write one fact per line, each line starting with "- ".
- Do not use markdown, bold text, tables or code blocks."#;

const JSON_CONTRACT: &str =
    "Respond with a single valid JSON object and nothing else. Do not wrap it in markdown.";

const MOLECULE_DETAILS_TEMPLATE: &str = r#"You are a medicinal chemistry assistant.
For the molecule with SMILES "{smiles}", provide:
- its IUPAC name,
- a short explanation of how the SMILES notation maps to the structure,
- diseases or conditions the molecule could potentially be used to treat.

Use this exact shape:
{"iupacName": "...", "conversionDetails": "...", "potentialDiseases": "..."}

{contract}"#;

const MOLECULE_REPORT_TEMPLATE: &str = r#"You are a medicinal chemistry assistant.
Write a report on the molecule with SMILES "{smiles}" with these sections:
1. Structural Details:
2. Physicochemical Properties:
3. Pharmacological Profile:
4. Safety Considerations:

{contract}"#;

const COST_ESTIMATION_TEMPLATE: &str = r#"You are a pharmaceutical manufacturing consultant.
Estimate the cost of developing and producing the compound "{title}" (SMILES "{smiles}").
Cover these sections:
1. Synthesis Route:
2. Raw Material Costs:
3. Manufacturing Costs:
4. Regulatory Costs:
5. Total Estimated Cost:

Give figures in US dollars where possible.

{contract}"#;

const TOXICITY_TEMPLATE: &str = r#"You are a toxicology assistant.
Predict the toxicity profile of the molecule with SMILES "{smiles}".
Cover these sections:
1. Acute Toxicity:
2. Organ Toxicity:
3. Toxicological Endpoints:
4. Toxicity Class:

Include an estimated LD50 in mg/kg where possible.

{contract}"#;

const VARIANT_INFO_TEMPLATE: &str = r#"You are a medicinal chemistry assistant.
The molecule with SMILES "{smiles}" is a generated variant of a lead compound.
Describe it in these sections:
1. Structural Changes:
2. Drug Likeness:
3. Expected Activity:
4. Synthesis Feasibility:

Mention QED and LogP estimates where possible.

{contract}"#;

const DRUG_NAMES_TEMPLATE: &str = r#"You are a pharmaceutical branding assistant.
Suggest five candidate drug names for the compound "{title}" with SMILES "{smiles}".
Names must be pronounceable, must not match existing marketed drugs, and should hint at the compound's chemistry.

Use this exact shape:
{"names": ["...", "...", "...", "...", "..."]}

{contract}"#;

const RESEARCH_PAPER_TEMPLATE: &str = r#"You are a scientific writing assistant.
Draft a short research paper about the compound "{title}" with SMILES "{smiles}".

Use this exact shape:
{"title": "...", "abstract": "...", "introduction": "...", "methodology": "...", "results": "...", "conclusion": "...", "references": ["..."]}

{contract}"#;

const TARGET_PREDICTION_TEMPLATE: &str = r#"You are a chemoinformatics assistant.
Predict the most likely protein targets of the molecule with SMILES "{smiles}".
Give at most five targets with a confidence between 0 and 1.

Use this exact shape:
{"targets": [{"protein": "...", "confidence": 0.0}]}

{contract}"#;

fn plain_text(template: &str, smiles: &Smiles) -> String {
    template
        .replace("{smiles}", smiles.as_str())
        .replace("{contract}", PLAIN_TEXT_CONTRACT)
}

fn json(template: &str, smiles: &Smiles) -> String {
    template
        .replace("{smiles}", smiles.as_str())
        .replace("{contract}", JSON_CONTRACT)
}

/// JSON prompt for the IUPAC name, conversion notes and candidate indications.
pub fn molecule_details(smiles: &Smiles) -> String {
    json(MOLECULE_DETAILS_TEMPLATE, smiles)
}

pub fn molecule_report(smiles: &Smiles) -> String {
    plain_text(MOLECULE_REPORT_TEMPLATE, smiles)
}

pub fn cost_estimation(smiles: &Smiles, title: &str) -> String {
    plain_text(&COST_ESTIMATION_TEMPLATE.replace("{title}", title), smiles)
}

pub fn toxicity_report(smiles: &Smiles) -> String {
    plain_text(TOXICITY_TEMPLATE, smiles)
}

pub fn variant_info(smiles: &Smiles) -> String {
    plain_text(VARIANT_INFO_TEMPLATE, smiles)
}

pub fn drug_names(smiles: &Smiles, title: &str) -> String {
    json(&DRUG_NAMES_TEMPLATE.replace("{title}", title), smiles)
}

pub fn research_paper(title: &str, smiles: &Smiles) -> String {
    json(&RESEARCH_PAPER_TEMPLATE.replace("{title}", title), smiles)
}

pub fn target_prediction(smiles: &Smiles) -> String {
    json(TARGET_PREDICTION_TEMPLATE, smiles)
}
