/// Canonical `name@realm` identity string used for the snapshot cache key,
/// working file names, log lines, and email subjects. Whitespace is stripped
/// from the realm so the identity is safe as a file name.
pub fn character_id(name: &str, realm: &str) -> String {
    let realm: String = realm.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}@{}", name, realm)
}
