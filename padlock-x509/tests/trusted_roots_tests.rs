// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use padlock_test_utils::Issued;
use padlock_x509::{TrustStoreError, TrustedRootSet, TrustedRootsHandle};

#[test]
fn pem_bundle_loads_every_certificate_block() {
    let a = Issued::root("Root A");
    let b = Issued::root("Root B");
    let bundle = format!("{}\n{}{}", a.pem(), a.key.serialize_pem(), b.pem());

    let set = TrustedRootSet::from_pem(bundle.as_bytes()).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.find_exact(&a.der()).is_some());
    assert!(set.find_exact(&b.der()).is_some());

    let subjects: Vec<&str> = set.iter().map(|r| r.subject_dn.as_str()).collect();
    assert_eq!(subjects, vec!["CN=Root A", "CN=Root B"]);
}

#[test]
fn empty_or_certificate_free_bundles_are_rejected() {
    assert_eq!(TrustedRootSet::from_pem(b"").unwrap_err(), TrustStoreError::NoCertificates);
    assert_eq!(
        TrustedRootSet::from_pem(b"just some text\n").unwrap_err(),
        TrustStoreError::NoCertificates
    );

    let key_only = Issued::root("Root").key.serialize_pem();
    let err = TrustedRootSet::from_pem(key_only.as_bytes()).unwrap_err();
    assert_eq!(err.error_code(), "TRUST_STORE_EMPTY");

    let none: Vec<Vec<u8>> = Vec::new();
    assert_eq!(TrustedRootSet::from_der_certs(none).unwrap_err(), TrustStoreError::NoCertificates);
}

#[test]
fn unparseable_certificate_is_rejected() {
    let bundle = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
    let err = TrustedRootSet::from_pem(bundle.as_bytes()).unwrap_err();
    assert!(matches!(err, TrustStoreError::InvalidCertificate { index: 0, .. }), "{err}");
    assert_eq!(err.error_code(), "TRUST_STORE_INVALID_CERTIFICATE");
}

#[test]
fn clones_share_storage() {
    let set = TrustedRootSet::from_der_certs([Issued::root("Root").der()]).unwrap();
    let copy = set.clone();
    assert_eq!(copy.len(), 1);
    assert!(std::ptr::eq(set.iter().next().unwrap(), copy.iter().next().unwrap()));
}

#[test]
fn handle_swaps_without_disturbing_snapshots() {
    let old_root = Issued::root("Old Root");
    let new_root = Issued::root("New Root");
    let handle = TrustedRootsHandle::new(TrustedRootSet::from_der_certs([old_root.der()]).unwrap());

    let in_flight = handle.current();
    let previous = handle.replace(TrustedRootSet::from_der_certs([new_root.der(), old_root.der()]).unwrap());

    assert!(Arc::ptr_eq(&in_flight, &previous));
    assert_eq!(in_flight.len(), 1);
    assert!(in_flight.find_exact(&new_root.der()).is_none());

    let now = handle.current();
    assert_eq!(now.len(), 2);
    assert!(now.find_exact(&new_root.der()).is_some());
}

#[test]
fn handle_is_shareable_across_threads() {
    let handle = Arc::new(TrustedRootsHandle::from(
        TrustedRootSet::from_der_certs([Issued::root("Root 0").der()]).unwrap(),
    ));
    let replacement = Issued::root("Root 1").der();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let h = Arc::clone(&handle);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    // Every snapshot is a complete set: one or the other root, never empty.
                    assert_eq!(h.current().len(), 1);
                }
            })
        })
        .collect();

    handle.replace(TrustedRootSet::from_der_certs([replacement]).unwrap());
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(handle.current().iter().next().unwrap().subject_dn, "CN=Root 1");
}
