use rvb_core::PlayerId;

/// Lifetime the issuance service stamps on access tokens.
pub const TOKEN_TTL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// Role claims granted by the token issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Admin,
}

/// Verified identity carried by a bearer token.
///
/// Token issuance lives outside this system; the gateway only consumes
/// verified claims. `sub` is the authenticated player id — clients never
/// supply their own.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    sub: uuid::Uuid,
    name: String,
    roles: Vec<Role>,
    exp: u64,
}

impl Claims {
    pub fn new(player: PlayerId, name: String, roles: Vec<Role>, ttl: std::time::Duration) -> Self {
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .as_secs()
            + ttl.as_secs();
        Self {
            sub: player.uuid(),
            name,
            roles,
            exp,
        }
    }
    pub fn player(&self) -> PlayerId {
        PlayerId::from(self.sub)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
    pub fn expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .as_secs();
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvb_core::ID;

    #[test]
    fn roles_gate_admin() {
        let claims = Claims::new(
            ID::fresh(),
            "alice".into(),
            vec![Role::Player],
            std::time::Duration::from_secs(60),
        );
        assert!(!claims.is_admin());
        assert!(!claims.expired());
    }
}
