use uuid::Uuid;

pub fn profile(user_id: Uuid) -> String {
    format!("user:{user_id}:profile")
}

pub fn journey_prefix(user_id: Uuid) -> String {
    format!("user:{user_id}:journey:")
}

pub fn journey_entry(user_id: Uuid, entry_id: &str) -> String {
    format!("{}{entry_id}", journey_prefix(user_id))
}
