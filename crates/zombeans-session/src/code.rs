//! Room-code generation.

use rand::Rng;
use zombeans_protocol::RoomCode;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draws codes until one is not `taken`.
pub(crate) fn unique_code<R: Rng>(rng: &mut R, taken: impl Fn(&RoomCode) -> bool) -> RoomCode {
    loop {
        let code = random_code(rng);
        if !taken(&code) {
            return code;
        }
        tracing::debug!(%code, "room code collision, redrawing");
    }
}

fn random_code<R: Rng>(rng: &mut R) -> RoomCode {
    let code: String = (0..RoomCode::LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}
