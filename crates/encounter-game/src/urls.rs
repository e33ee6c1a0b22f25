//! Admin UI addresses and popup-opening scripts.

/// `http://{domain}/Login.aspx?return=%2f`
pub fn admin_url(domain: &str) -> String {
    format!("http://{domain}/Login.aspx?return=%2f")
}

/// `http://{domain}/Administration/Games/LevelManager.aspx?gid={gid}`
pub fn manager_url(domain: &str, game_id: u32) -> String {
    format!("http://{domain}/Administration/Games/LevelManager.aspx?gid={game_id}")
}

/// `http://{domain}/Administration/Games/LevelEditor.aspx?gid={gid}&level={lid}`
pub fn level_url(domain: &str, game_id: u32, level_id: u32) -> String {
    format!("http://{domain}/Administration/Games/LevelEditor.aspx?gid={game_id}&level={level_id}")
}

/// Absolute URL for an href found on an admin page.
pub fn absolute(domain: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("http://{domain}{href}")
    } else {
        format!("http://{domain}/{href}")
    }
}

pub fn name_editor_script(game_id: u32, level_id: u32) -> String {
    format!("GameEditor('./NameCommentEdit.aspx?gid={game_id}&level={level_id}', '');")
}

pub fn new_hint_script(game_id: u32, level_id: u32) -> String {
    format!(
        "GameEditor('./PromptEdit.aspx?gid={game_id}&level={level_id}', 'Prompt_{game_id}_{level_id}');"
    )
}

pub fn new_penalized_hint_script(game_id: u32, level_id: u32) -> String {
    format!(
        "GameEditor('./PromptEdit.aspx?gid={game_id}&level={level_id}&penalty=1', 'Prompt_{game_id}_{level_id}');"
    )
}

pub fn new_bonus_script(game_id: u32, level_id: u32) -> String {
    format!(
        "GameEditor('./BonusEdit.aspx?gid={game_id}&level={level_id}', 'Bonus_{game_id}_{level_id}');"
    )
}

pub fn file_uploader_script(game_id: u32) -> String {
    format!("javascript:Editor('./FileUploader.aspx?gid={game_id}', 'FileUploader_{game_id}');")
}
