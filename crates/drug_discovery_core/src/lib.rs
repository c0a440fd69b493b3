pub mod domain;
pub mod parsing;
pub mod ports;
pub mod prompts;
pub mod retry;

pub use domain::{
    AuthSession, ChatMessage, CostEstimation, DrugNameSuggestion, Molecule, OtpCode, PaperKind,
    RelatedWork, ResearchPaper, SavedSearch, Section, Smiles, SuggestionStatus, ToxicityResult,
    User, UserCredentials, ValidationError,
};
pub use parsing::{extract_json, parse_report, parse_sections, ExtractError, Report, NO_DETAILS_SENTINEL};
pub use ports::{
    DatabaseService, LiteratureService, OtpDeliveryService, PortError, PortResult,
    TextGenerationService,
};
pub use retry::RetryPolicy;
