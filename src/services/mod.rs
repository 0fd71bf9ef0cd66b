pub mod answer_cache;
pub mod answer_store;
pub mod autosave;
pub mod exam_timer;
pub mod fullscreen;

pub use answer_cache::{AnswerCache, StoredAnswers, STORAGE_VERSION};
pub use answer_store::{shared_store, AnswerStore, SharedAnswerStore};
pub use autosave::{AutosaveHandle, AutosaveScheduler};
pub use exam_timer::{run_countdown, ExamTimer};
pub use fullscreen::{BrowserSurface, FocusSurface, FullscreenGuard, GuardState, NoopSurface};
