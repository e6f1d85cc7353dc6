/// RADIUS packet codes as defined in RFC 2865 Section 4
///
/// Only the codes a NAS-side client sends or receives are modeled. A packet
/// carrying any other code fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Accounting-Request (4) - RFC 2866
    AccountingRequest = 4,
    /// Accounting-Response (5) - RFC 2866
    AccountingResponse = 5,
    /// Access-Challenge (11)
    AccessChallenge = 11,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            4 => Some(Code::AccountingRequest),
            5 => Some(Code::AccountingResponse),
            11 => Some(Code::AccessChallenge),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this code is one a server sends back to a client
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Code::AccessAccept
                | Code::AccessReject
                | Code::AccessChallenge
                | Code::AccountingResponse
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for value in [1u8, 2, 3, 4, 5, 11] {
            let code = Code::from_u8(value).unwrap();
            assert_eq!(code.as_u8(), value);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(Code::from_u8(0), None);
        assert_eq!(Code::from_u8(12), None);
        assert_eq!(Code::from_u8(255), None);
    }

    #[test]
    fn test_response_codes() {
        assert!(Code::AccessAccept.is_response());
        assert!(Code::AccountingResponse.is_response());
        assert!(!Code::AccessRequest.is_response());
        assert!(!Code::AccountingRequest.is_response());
    }
}
