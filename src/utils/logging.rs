use tracing::{error, info, warn, debug};

/// Logs command start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64) {
    info!(
        "CMD_START: {} by {}({}) in chat {}",
        command, user, user_id, chat_id
    );
}

/// Logs command completion with consistent format
pub fn log_command_success(command: &str, user: &str, user_id: i64, chat_id: i64, replies: usize) {
    info!(
        "CMD_SUCCESS: {} by {}({}) in chat {} - {} replies",
        command, user, user_id, chat_id, replies
    );
}

/// Logs command errors with consistent format
pub fn log_command_error(command: &str, user: &str, user_id: i64, chat_id: i64, error: &str) {
    error!(
        "CMD_ERROR: {} by {}({}) in chat {} - {}",
        command, user, user_id, chat_id, error
    );
}

/// Logs claim decisions with consistent format
pub fn log_claim(outcome: &str, user_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CLAIM: {} for user {} - {}", outcome, user_id, d),
        None => info!("CLAIM: {} for user {}", outcome, user_id),
    }
}

/// Logs claims that were refused by policy
pub fn log_claim_refused(reason: &str, user_id: i64) {
    warn!("CLAIM_REFUSED: {} for user {}", reason, user_id);
}

/// Logs database operations with consistent format
pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

/// Logs database errors with consistent format
pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    match details {
        Some(d) => error!("DB_ERROR: {} on {} failed: {} - {}", operation, table, error, d),
        None => error!("DB_ERROR: {} on {} failed: {}", operation, table, error),
    }
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
