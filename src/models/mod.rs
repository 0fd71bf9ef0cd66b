pub mod answer;
pub mod attempt;
pub mod loaders;
pub mod question;
pub mod skill;

pub use answer::{Answer, AnswerPayload};
pub use attempt::{
    shared_attempt, AttemptStatus, CompletionSummary, ExamAttempt, SectionAttempt, SectionScore,
    SectionStatus, SharedAttempt,
};
pub use loaders::{load_all_scripts, load_script_file, AttemptScript, ScriptedAnswer, ScriptedResponse};
pub use question::{Choice, Question, QuestionKind, SectionQuestions};
pub use skill::Skill;
