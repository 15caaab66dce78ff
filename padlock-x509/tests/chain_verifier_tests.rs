// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Chain trust evaluation against rcgen-built hierarchies.

use padlock_common::CertificateChain;
use padlock_test_utils::rcgen::{IsCa, KeyPair, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384};
use padlock_test_utils::{ca_params, leaf_params, rsa_key_pair, set_validity, Issued, TestPki};
use padlock_x509::{evaluate_trust, evaluate_trust_at, ChainBreak, TrustedRootSet, MAX_CHAIN_LEN};

fn roots_of(certs: &[&Issued]) -> TrustedRootSet {
    TrustedRootSet::from_der_certs(certs.iter().map(|c| c.der())).unwrap()
}

fn chain(ders: Vec<Vec<u8>>) -> CertificateChain {
    CertificateChain::new(ders).unwrap()
}

#[test]
fn trusted_with_zero_one_and_two_intermediates() {
    for n in 0..=2 {
        let pki = TestPki::new(n, "leaf.example", &[]);
        let roots = roots_of(&[&pki.root]);

        let path = evaluate_trust(&chain(pki.chain_der()), &roots).unwrap_or_else(|e| panic!("n={n}: {e}"));
        assert!(!path.anchor_in_chain);
        assert_eq!(path.depth(), n + 2);
        assert_eq!(path.anchor.der, pki.root.der());

        // Presenting the root as well terminates on the exact trusted DER.
        let path = evaluate_trust(&chain(pki.chain_der_with_root()), &roots).unwrap();
        assert!(path.anchor_in_chain);
        assert_eq!(path.depth(), n + 2);
    }
}

#[test]
fn substituted_issuer_with_same_name_breaks_at_that_link() {
    let pki = TestPki::new(2, "leaf.example", &[]);
    let roots = roots_of(&[&pki.root]);
    let original = pki.chain_der();

    // chain = [leaf, intermediate 2, intermediate 1]
    for (k, name) in [(0, "Padlock Test Intermediate 2"), (1, "Padlock Test Intermediate 1")] {
        let impostor = Issued::root(name);
        let mut ders = original.clone();
        ders[k + 1] = impostor.der();

        let err = evaluate_trust(&chain(ders), &roots).unwrap_err();
        assert_eq!(err.break_point, ChainBreak::BadLinkSignature { index: k }, "{err}");
        assert_eq!(err.error_code(), "CERT_CHAIN_BAD_LINK_SIGNATURE");
    }
}

#[test]
fn unrelated_issuer_is_issuer_mismatch() {
    let pki = TestPki::new(2, "leaf.example", &[]);
    let roots = roots_of(&[&pki.root]);
    let stranger = Issued::root("Somebody Else");

    for k in 0..2 {
        let mut ders = pki.chain_der();
        ders[k + 1] = stranger.der();
        let err = evaluate_trust(&chain(ders), &roots).unwrap_err();
        assert_eq!(err.break_point, ChainBreak::IssuerMismatch { index: k }, "{err}");
    }
}

#[test]
fn self_signed_chain_is_not_trusted() {
    let pki = TestPki::new(0, "leaf.example", &[]);
    let roots = roots_of(&[&pki.root]);

    let rogue = Issued::self_signed(leaf_params("leaf.example", &[]));
    let err = evaluate_trust(&chain(vec![rogue.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::UntrustedRoot { index: 0 });
    assert_eq!(err.error_code(), "CERT_CHAIN_UNTRUSTED_ROOT");

    // A rogue root reusing the trusted root's name does not help.
    let rogue_root = Issued::root("Padlock Test Root");
    let rogue_leaf = rogue_root.leaf("leaf.example", &[]);
    let err = evaluate_trust(&chain(vec![rogue_leaf.der(), rogue_root.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::UntrustedRoot { index: 1 });

    let err = evaluate_trust(&chain(vec![rogue_leaf.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::UntrustedRoot { index: 0 });
}

#[test]
fn chain_from_another_hierarchy_is_untrusted() {
    let trusted = TestPki::new(1, "leaf.example", &[]);
    let other = TestPki::new(1, "leaf.example", &[]);
    let roots = roots_of(&[&trusted.root]);

    let err = evaluate_trust(&chain(other.chain_der()), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::UntrustedRoot { index: 1 });
}

#[test]
fn pinned_leaf_is_trusted() {
    let leaf = Issued::self_signed(leaf_params("pinned.example", &[]));
    let roots = roots_of(&[&leaf]);

    let path = evaluate_trust(&chain(vec![leaf.der()]), &roots).unwrap();
    assert!(path.anchor_in_chain);
    assert_eq!(path.depth(), 1);
}

#[test]
fn non_ca_issuer_is_reported() {
    let root = Issued::root("Root");
    let not_a_ca = root.issue(leaf_params("Not A CA", &[]));
    let leaf = not_a_ca.leaf("leaf.example", &[]);
    let roots = roots_of(&[&root]);

    let err = evaluate_trust(&chain(vec![leaf.der(), not_a_ca.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::NotACertificateAuthority { index: 1 });
    assert_eq!(err.error_code(), "CERT_CHAIN_NOT_A_CA");

    // Same when the non-CA is the trusted anchor itself.
    let anchor_not_ca = Issued::self_signed(leaf_params("Anchor", &[]));
    let leaf = anchor_not_ca.leaf("leaf.example", &[]);
    let roots = roots_of(&[&anchor_not_ca]);
    let err = evaluate_trust(&chain(vec![leaf.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::NotACertificateAuthority { index: 1 });
}

#[test]
fn expired_and_not_yet_valid_are_reported_by_index() {
    let root = Issued::root("Root");
    let roots = roots_of(&[&root]);

    let mut params = leaf_params("old.example", &[]);
    set_validity(&mut params, ((2000, 1, 1), (2001, 1, 1)));
    let old = root.issue(params);
    let err = evaluate_trust(&chain(vec![old.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::Expired { index: 0 });

    let mut params = leaf_params("future.example", &[]);
    set_validity(&mut params, ((3000, 1, 1), (3001, 1, 1)));
    let future = root.issue(params);
    let err = evaluate_trust(&chain(vec![future.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::NotYetValid { index: 0 });
    assert_eq!(err.error_code(), "CERT_CHAIN_NOT_YET_VALID");

    let mut params = ca_params("Old Intermediate");
    set_validity(&mut params, ((2000, 1, 1), (2001, 1, 1)));
    let old_ca = root.issue(params);
    let leaf = old_ca.leaf("leaf.example", &[]);
    let err = evaluate_trust(&chain(vec![leaf.der(), old_ca.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::Expired { index: 1 });
}

#[test]
fn expired_anchor_is_reported_past_the_chain() {
    let mut params = ca_params("Old Root");
    set_validity(&mut params, ((2000, 1, 1), (2001, 1, 1)));
    let root = Issued::self_signed(params);
    let leaf = root.leaf("leaf.example", &[]);
    let roots = roots_of(&[&root]);

    let err = evaluate_trust(&chain(vec![leaf.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::Expired { index: 1 });
}

#[test]
fn evaluation_time_is_explicit() {
    let pki = TestPki::new(1, "leaf.example", &[]);
    let roots = roots_of(&[&pki.root]);
    let c = chain(pki.chain_der());

    // 2000-01-01T00:00:00Z is the default notBefore.
    let not_before = 946_684_800;
    assert!(evaluate_trust_at(&c, &roots, not_before).is_ok());

    let err = evaluate_trust_at(&c, &roots, not_before - 1).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::NotYetValid { index: 0 });
}

#[test]
fn overlong_and_unparseable_chains() {
    let pki = TestPki::new(0, "leaf.example", &[]);
    let roots = roots_of(&[&pki.root]);

    let long = chain(vec![pki.leaf.der(); MAX_CHAIN_LEN + 1]);
    let err = evaluate_trust(&long, &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::TooLong { len: MAX_CHAIN_LEN + 1 });
    assert_eq!(err.break_point.index(), None);

    let broken = chain(vec![pki.leaf.der(), vec![0x30, 0x00]]);
    let err = evaluate_trust(&broken, &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::InvalidCertificate { index: 1 });
}

#[test]
fn non_ca_root_does_not_shadow_a_ca_root_with_the_same_name() {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let same_key = KeyPair::try_from(key.serialize_der().as_slice()).unwrap();

    let mut non_ca_params = ca_params("Shared Root");
    non_ca_params.is_ca = IsCa::ExplicitNoCa;
    let non_ca = Issued::self_signed_with(non_ca_params, same_key);
    let ca = Issued::self_signed_with(ca_params("Shared Root"), key);
    let leaf = ca.leaf("leaf.example", &[]);

    // The non-CA root comes first and its key verifies the leaf too.
    let roots = roots_of(&[&non_ca, &ca]);
    let path = evaluate_trust(&chain(vec![leaf.der()]), &roots).unwrap();
    assert!(path.anchor.is_ca);
    assert_eq!(path.anchor.der, ca.der());

    let roots = roots_of(&[&non_ca]);
    let err = evaluate_trust(&chain(vec![leaf.der()]), &roots).unwrap_err();
    assert_eq!(err.break_point, ChainBreak::NotACertificateAuthority { index: 1 });
}

#[test]
fn rsa_and_p384_issuers_are_supported() {
    let (_, rsa_key) = rsa_key_pair();
    let root = Issued::self_signed_with(ca_params("RSA Root"), rsa_key);

    let p384 = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap();
    let intermediate = root.issue_with(ca_params("P-384 Intermediate"), p384);
    let leaf = intermediate.leaf("leaf.example", &[]);

    let roots = roots_of(&[&root]);
    let path = evaluate_trust(&chain(vec![leaf.der(), intermediate.der()]), &roots).unwrap();
    assert_eq!(path.anchor.signature_oid, "1.2.840.113549.1.1.11");
    assert_eq!(path.certificates[0].signature_oid, "1.2.840.10045.4.3.3");
}
