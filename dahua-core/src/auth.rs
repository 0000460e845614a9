//! Challenge-response password digest for RPC2 login
//!
//! The device answers the first login round with a `realm` and a one-time
//! `random`. The proof sent back is two chained upper-case MD5 digests:
//!
//! ```text
//! pwd  = MD5("{user}:{realm}:{password}")
//! pass = MD5("{user}:{random}:{pwd}")
//! ```

use crate::protocol::Challenge;

fn upper_md5(phrase: &str) -> String {
    format!("{:X}", md5::compute(phrase.as_bytes()))
}

/// First digest: binds the password to the device realm
pub fn password_hash(username: &str, realm: &str, password: &str) -> String {
    upper_md5(&format!("{username}:{realm}:{password}"))
}

/// Second digest: binds the first one to the one-time random
pub fn pass_hash(username: &str, random: &str, password_hash: &str) -> String {
    upper_md5(&format!("{username}:{random}:{password_hash}"))
}

/// Full credential proof for a challenge
pub fn login_digest(username: &str, password: &str, challenge: &Challenge) -> String {
    let pwd = password_hash(username, &challenge.realm, password);
    pass_hash(username, &challenge.random, &pwd)
}
