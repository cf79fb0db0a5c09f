use std::net::Ipv4Addr;

use ppp_ipcp::option::{AddressOption, ConfigurationOption, UnknownOption};
use ppp_ipcp::types::{option_id, ConfigurationOptionState};

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const OTHER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    #[test]
    pub fn test_send_configure_req_encodes_local_value() {
        let mut opt = AddressOption::ip_address();
        opt.set_local_address(Some(LOCAL));

        let mut buf = [0u8; 8];
        let written = opt.send_configure_req(&mut buf);

        assert_eq!(written, 6, "IP-Address TLV is 6 bytes");
        assert_eq!(&buf[..6], &[0x03, 0x06, 10, 0, 0, 1], "TLV layout mismatch");
    }

    #[test]
    pub fn test_unset_value_goes_out_as_wildcard() {
        let mut opt = AddressOption::primary_dns();
        let mut buf = [0xFFu8; 6];

        assert_eq!(opt.send_configure_req(&mut buf), 6);
        assert_eq!(buf, [129, 6, 0, 0, 0, 0], "unset DNS must be sent as 0.0.0.0");
    }

    #[test]
    pub fn test_short_buffer_writes_nothing() {
        let mut opt = AddressOption::ip_address();
        opt.set_local_address(Some(LOCAL));
        let mut buf = [0u8; 5];

        assert_eq!(opt.send_configure_req(&mut buf), 0, "5 bytes cannot hold the TLV");
        assert_eq!(buf, [0u8; 5], "nothing may be written on failure");
        assert_eq!(opt.send_configure_ack(&mut buf), 0);
        assert_eq!(opt.send_configure_nak(&mut buf), 0);
        assert_eq!(opt.send_configure_rej(&mut buf), 0);
    }

    #[test]
    pub fn test_round_trip_ack_when_values_agree() {
        let mut ours = AddressOption::ip_address();
        ours.set_local_address(Some(LOCAL));
        let mut theirs = AddressOption::ip_address();
        theirs.set_peer_address(Some(LOCAL));

        let mut wire = [0u8; 6];
        ours.send_configure_req(&mut wire);

        assert_eq!(theirs.recv_configure_req(&wire), 6);
        assert_eq!(theirs.state_peer(), ConfigurationOptionState::Ack);
        assert_eq!(theirs.peer_idea(), Some(LOCAL), "peer idea is what was asked");

        let mut reply = [0u8; 6];
        assert_eq!(theirs.send_configure_ack(&mut reply), 6);
        assert_eq!(reply, wire, "an Ack repeats the request");

        assert_eq!(ours.recv_configure_ack(&reply), 6);
        assert_eq!(ours.state_local(), ConfigurationOptionState::Ack);
    }

    #[test]
    pub fn test_round_trip_nak_when_values_differ() {
        let mut ours = AddressOption::ip_address();
        ours.set_local_address(Some(LOCAL));
        let mut theirs = AddressOption::ip_address();
        theirs.set_peer_address(Some(OTHER));

        let mut wire = [0u8; 6];
        ours.send_configure_req(&mut wire);

        assert_eq!(theirs.recv_configure_req(&wire), 6);
        assert_eq!(theirs.state_peer(), ConfigurationOptionState::Nak);
        assert_eq!(theirs.peer_idea(), Some(LOCAL));

        let mut reply = [0u8; 6];
        theirs.send_configure_nak(&mut reply);
        assert_eq!(reply, [3, 6, 10, 0, 0, 2], "Nak carries the value we expect");

        // We already had a value of our own, the suggestion is not taken
        assert_eq!(ours.recv_configure_nak(&reply), 6);
        assert_eq!(ours.state_local(), ConfigurationOptionState::Nak);
        assert_eq!(ours.local_address(), Some(LOCAL));
    }

    #[test]
    pub fn test_wildcard_request_without_value_is_rejected() {
        let mut opt = AddressOption::ip_address();
        let req = [0x03, 0x06, 0, 0, 0, 0];

        assert_eq!(opt.recv_configure_req(&req), 6);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::Rej);
        assert_eq!(opt.peer_idea(), None);

        let mut reply = [0u8; 6];
        assert_eq!(opt.send_configure_rej(&mut reply), 6);
        assert_eq!(reply, req, "Reject echoes the peer's idea");
    }

    #[test]
    pub fn test_concrete_request_without_value_is_adopted_and_naked() {
        let mut opt = AddressOption::ip_address();
        let req = [0x03, 0x06, 203, 0, 113, 5];

        assert_eq!(opt.recv_configure_req(&req), 6);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::Nak);
        assert_eq!(opt.peer_address(), Some(Ipv4Addr::new(203, 0, 113, 5)));

        let mut reply = [0u8; 6];
        opt.send_configure_nak(&mut reply);
        assert_eq!(reply, req, "Nak suggests the adopted value");

        // The same request again is now acceptable
        assert_eq!(opt.recv_configure_req(&req), 6);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::Ack);
    }

    #[test]
    pub fn test_wildcard_request_with_value_is_naked() {
        let mut opt = AddressOption::secondary_dns();
        opt.set_peer_address(Some(Ipv4Addr::new(8, 8, 4, 4)));

        assert_eq!(opt.recv_configure_req(&[131, 6, 0, 0, 0, 0]), 6);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::Nak);

        let mut reply = [0u8; 6];
        opt.send_configure_nak(&mut reply);
        assert_eq!(reply, [131, 6, 8, 8, 4, 4]);
    }

    #[test]
    pub fn test_ack_with_other_value_is_refused() {
        let mut opt = AddressOption::ip_address();
        opt.set_local_address(Some(LOCAL));

        assert_eq!(opt.recv_configure_ack(&[3, 6, 10, 0, 0, 2]), 0);
        assert_eq!(opt.state_local(), ConfigurationOptionState::None, "state must not move");
    }

    #[test]
    pub fn test_nak_fills_in_unset_value() {
        let mut opt = AddressOption::primary_dns();

        assert_eq!(opt.recv_configure_nak(&[129, 6, 1, 1, 1, 1]), 6);
        assert_eq!(opt.state_local(), ConfigurationOptionState::Nak);
        assert_eq!(opt.local_address(), Some(Ipv4Addr::new(1, 1, 1, 1)));

        let mut buf = [0u8; 6];
        opt.send_configure_req(&mut buf);
        assert_eq!(buf, [129, 6, 1, 1, 1, 1], "next request carries the suggestion");
    }

    #[test]
    pub fn test_reject_marks_local_side() {
        let mut opt = AddressOption::netmask();

        assert_eq!(opt.recv_configure_rej(&[144, 6, 0, 0, 0, 0]), 6);
        assert_eq!(opt.state_local(), ConfigurationOptionState::Rej);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::None);
    }

    #[test]
    pub fn test_validate_checks_id_length_and_bounds() {
        let opt = AddressOption::ip_address();

        assert!(opt.validate(&[3, 6, 1, 2, 3, 4]));
        assert!(!opt.validate(&[129, 6, 1, 2, 3, 4]), "wrong id");
        assert!(!opt.validate(&[3, 4, 1, 2]), "wrong length");
        assert!(!opt.validate(&[3, 6, 1, 2]), "truncated");
        assert!(!opt.validate(&[3]), "no header");
    }

    #[test]
    pub fn test_malformed_input_is_not_consumed() {
        let mut opt = AddressOption::ip_address();

        assert_eq!(opt.recv_configure_req(&[3, 6, 1, 2]), 0);
        assert_eq!(opt.recv_configure_nak(&[3, 5, 1, 2, 3]), 0);
        assert_eq!(opt.recv_configure_rej(&[129, 6, 1, 2, 3, 4]), 0);
        assert_eq!(opt.state_local(), ConfigurationOptionState::None);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::None);
    }

    #[test]
    pub fn test_reset_keeps_identity_and_values() {
        let mut opt = AddressOption::ip_address();
        opt.set_local_address(Some(LOCAL));
        opt.negotiation_mut().flags_local = 1;
        opt.recv_configure_rej(&[3, 6, 0, 0, 0, 0]);
        opt.recv_configure_req(&[3, 6, 10, 0, 0, 9]);

        opt.reset();
        let once = opt.clone();
        opt.reset();

        assert_eq!(opt, once, "reset is idempotent");
        assert_eq!(opt.state_local(), ConfigurationOptionState::None);
        assert_eq!(opt.state_peer(), ConfigurationOptionState::None);
        assert_eq!(opt.id(), option_id::IP_ADDRESS);
        assert_eq!(opt.length(), 6);
        assert_eq!(opt.local_address(), Some(LOCAL));
        assert!(opt.negotiation().is_requested(), "flags survive a reset");
    }

    #[test]
    pub fn test_wants_request_follows_local_state() {
        let mut opt = AddressOption::ip_address();
        assert!(!opt.negotiation().wants_request(), "not requested yet");

        opt.negotiation_mut().flags_local = 1;
        assert!(opt.negotiation().wants_request());

        opt.recv_configure_nak(&[3, 6, 10, 0, 0, 1]);
        assert!(opt.negotiation().wants_request(), "a Nak'd option is asked again");

        opt.recv_configure_ack(&[3, 6, 10, 0, 0, 1]);
        assert!(!opt.negotiation().wants_request(), "an Ack'd option is settled");
    }

    #[test]
    pub fn test_unknown_option_is_rejected_verbatim() {
        // IP-Compression-Protocol, Van Jacobson, max slot 15, no slot compression
        let req = [0x02, 0x06, 0x00, 0x2D, 0x0F, 0x00, 0xAA];
        let mut opt = UnknownOption::new();

        assert_eq!(opt.recv_configure_req(&req), 6, "consumes its own length only");
        assert_eq!(opt.state_peer(), ConfigurationOptionState::Rej);
        assert_eq!(opt.id(), option_id::IP_COMPRESSION_PROTOCOL);
        assert_eq!(opt.raw(), &req[..6]);

        let mut reply = [0u8; 6];
        assert_eq!(opt.send_configure_rej(&mut reply), 6);
        assert_eq!(&reply, &req[..6], "reject echoes the raw bytes");

        let mut short = [0u8; 4];
        assert_eq!(opt.send_configure_rej(&mut short), 0);
        assert_eq!(opt.send_configure_nak(&mut reply), 0);
        assert_eq!(opt.send_configure_ack(&mut reply), 0);
    }

    #[test]
    pub fn test_unknown_option_with_bad_length_is_not_consumed() {
        let mut opt = UnknownOption::new();

        assert_eq!(opt.recv_configure_req(&[0x42, 0x01]), 0, "length below header size");
        assert_eq!(opt.recv_configure_req(&[0x42, 0x08, 1, 2]), 0, "length past the buffer");
        assert_eq!(opt.state_peer(), ConfigurationOptionState::None);
    }
}
