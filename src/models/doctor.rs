use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub img: String,
    pub dept: String,
    /// Login account of this doctor, if one is linked.
    pub user_id: Option<i64>,
}

/// Doctor listing entry plus the account created alongside it.
#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub specialty: String,
    pub img: String,
    pub dept: String,
}
