use crate::packet::Packet;
use rand::Rng;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
///
/// A client uses this to check Access-Accept, Access-Reject, Access-Challenge
/// and Accounting-Response packets against the request it sent.
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> [u8; 16] {
    let mut data = Vec::new();

    // Code (1 byte)
    data.push(packet.code.as_u8());

    // Identifier (1 byte)
    data.push(packet.identifier);

    // Length (2 bytes)
    let length = packet.length();
    data.push((length >> 8) as u8);
    data.push((length & 0xff) as u8);

    // Request Authenticator (16 bytes)
    data.extend_from_slice(request_authenticator);

    // Attributes
    for attr in &packet.attributes {
        let encoded = attr.encode().expect("Failed to encode attribute");
        data.extend_from_slice(&encoded);
    }

    // Secret
    data.extend_from_slice(secret);

    // Calculate MD5
    let digest = md5::compute(&data);
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&digest.0);
    authenticator
}

/// Calculate the Request Authenticator for Accounting-Request packets
/// per RFC 2866 Section 3
///
/// Request Authenticator = MD5(Code + ID + Length + 16 zero octets + Attributes + Secret)
///
/// The packet's own authenticator field is not read; the digest is always
/// computed as if it were zeroed.
pub fn calculate_accounting_request_authenticator(packet: &Packet, secret: &[u8]) -> [u8; 16] {
    let mut data = Vec::new();

    // Code (1 byte)
    data.push(packet.code.as_u8());

    // Identifier (1 byte)
    data.push(packet.identifier);

    // Length (2 bytes)
    let length = packet.length();
    data.push((length >> 8) as u8);
    data.push((length & 0xff) as u8);

    // Zeroed authenticator field (16 bytes)
    data.extend_from_slice(&[0u8; 16]);

    // Attributes
    for attr in &packet.attributes {
        let encoded = attr.encode().expect("Failed to encode attribute");
        data.extend_from_slice(&encoded);
    }

    // Secret
    data.extend_from_slice(secret);

    // Calculate MD5
    let digest = md5::compute(&data);
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&digest.0);
    authenticator
}

/// Verify Response Authenticator
///
/// Verifies that the Response Authenticator matches the expected value
/// calculated from the request and secret.
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    let calculated = calculate_response_authenticator(response, request_authenticator, secret);
    response.authenticator == calculated
}

/// Encrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The password is first padded to a multiple of 16 bytes, then XORed with
/// MD5(secret + request_authenticator) for the first 16 bytes, and
/// MD5(secret + previous_block) for subsequent blocks.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let password_bytes = password.as_bytes();

    // Pad password to multiple of 16 bytes
    let mut padded = password_bytes.to_vec();
    let padding_needed = (16 - (padded.len() % 16)) % 16;
    if padding_needed > 0 || padded.len() == 0 {
        padded.resize(padded.len() + padding_needed, 0);
    }
    if padded.len() == 0 {
        padded.resize(16, 0);
    }

    let mut result = Vec::new();
    let mut previous_block = authenticator.to_vec();

    for chunk in padded.chunks(16) {
        let mut data = Vec::new();
        data.extend_from_slice(secret);
        data.extend_from_slice(&previous_block);
        let hash = md5::compute(&data);

        let mut encrypted_block = [0u8; 16];
        for i in 0..16 {
            encrypted_block[i] = chunk[i] ^ hash.0[i];
        }

        previous_block = encrypted_block.to_vec();
        result.extend_from_slice(&encrypted_block);
    }

    result
}

/// Decrypt User-Password attribute per RFC 2865 Section 5.2
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, String> {
    if encrypted.len() % 16 != 0 || encrypted.is_empty() {
        return Err("Invalid encrypted password length".to_string());
    }

    let mut result = Vec::new();
    let mut previous_block = authenticator.to_vec();

    for chunk in encrypted.chunks(16) {
        let mut data = Vec::new();
        data.extend_from_slice(secret);
        data.extend_from_slice(&previous_block);
        let hash = md5::compute(&data);

        let mut decrypted_block = [0u8; 16];
        for i in 0..16 {
            decrypted_block[i] = chunk[i] ^ hash.0[i];
        }

        previous_block = chunk.to_vec();
        result.extend_from_slice(&decrypted_block);
    }

    // Remove padding (null bytes at the end)
    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result).map_err(|e| format!("Invalid UTF-8 in password: {}", e))
}
