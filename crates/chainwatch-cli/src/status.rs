//! One-line rendering of the session view.

use chainwatch_session::SessionView;

pub fn render(view: &SessionView) -> String {
    let chain = view
        .selected_chain
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("no chain");

    if view.locked {
        return format!("[Locked] {} (resumes on unlock)", chain);
    }

    let mut parts = vec![chain.to_string()];
    if let Some(account) = &view.account {
        let balance = match view.display_balance() {
            Some(balance) => balance,
            None if view.is_loading => "loading...".to_string(),
            None => "-".to_string(),
        };
        parts.push(format!("{}: {}", account.short(), balance));
    }
    if let Some(error) = view.error.as_ref().filter(|e| e.is_user_visible()) {
        parts.push(format!("error: {}", error));
    }

    format!("[{}] {}", view.connection.label(), parts.join(" | "))
}
