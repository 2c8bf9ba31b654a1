//! Track id generation.

use rand::Rng;

/// Custom alphabet without `-` and `_` for easier copy/paste.
const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated track ids.
pub const ID_LEN: usize = 8;

/// Generate an 8-character track id from the alphanumeric alphabet.
///
/// With 62 characters at length 8 the collision rate stays negligible for
/// a single project's worth of tracks; `insert_track` still guards with
/// a `DuplicateId` check.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
