mod commands;
mod queries;
mod types;

pub(crate) use commands::{
    acquire_global_lock, acquire_user_assessment_lock, create, finish, set_current_question,
};
pub(crate) use queries::{
    count_by_assessment, count_by_user_and_assessment, count_in_progress, find_by_id,
    find_by_id_for_update, find_in_progress, list_by_assessment, list_by_user, list_overdue,
};
pub(crate) use types::{CreateSubmission, FinalizeUpdate};
