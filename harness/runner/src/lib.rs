mod chat;
mod cli;
mod init;
mod progress;
mod rules;
mod run;
mod scheduler;
mod session;
mod types;

pub mod prelude {
    pub use crate::chat::{
        wait_until_ready, ChatError, ChatReply, ChatService, HistoryEntry, HttpChatService, Role,
    };
    pub use crate::cli::ParleyRunnerCli;
    pub use crate::init::init;
    pub use crate::progress::RunProgress;
    pub use crate::rules::evaluate;
    pub use crate::run::{run, RunOutcome};
    pub use crate::scheduler::{run_all, ProgressUpdate};
    pub use crate::session::simulate;
    pub use crate::types::ParleyResult;
}
