pub mod policy;
pub mod respondent;

pub use policy::{RespondContext, Respondent};
pub use respondent::{
    NoisyRespondent, RespondentKind, RespondentParams, SloppyRespondent, TruthfulRespondent,
};
