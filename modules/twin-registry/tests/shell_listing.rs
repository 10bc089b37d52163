#![allow(clippy::unwrap_used)]

//! Unified pagination behavior of the listing and lookup endpoints.

mod support;

use aas_core::AssetKind;
use dtr_paging::{CursorSource, PagingCursor};
use twin_registry::domain::service::ShellListingRequest;
use twin_registry::DomainError;

use support::{encode_params, service_with, TwinBuilder, STACK};

fn listing(limit: usize, cursor: Option<String>) -> ShellListingRequest {
    ShellListingRequest {
        limit: Some(limit),
        cursor,
        ..ShellListingRequest::default()
    }
}

// ============================================================================
// Lookup: completeness, precedence, fallthrough
// ============================================================================

#[tokio::test]
async fn lookup_chaining_emits_every_twin_exactly_once() {
    let mut twins = Vec::new();
    for i in 0..4 {
        twins.push(TwinBuilder::catalog(100 + i, &format!("MPI-{i}")).build());
    }
    for i in 0..3 {
        twins.push(TwinBuilder::serialized(200 + i, &format!("SN-{i}")).build());
    }
    twins.push(TwinBuilder::jis(300, "JIS-1").build());
    twins.push(TwinBuilder::batch(400, "B-1").build());
    let (service, _) = service_with(twins);

    let params = encode_params(&[("manufacturerId", support::MANUFACTURER)]);
    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;
    let mut calls = 0;
    loop {
        let page = service
            .lookup_shell_ids(STACK, &params, None, Some(3), cursor.as_deref())
            .await
            .unwrap();
        collected.extend(page.items);
        calls += 1;
        assert!(calls < 20, "pagination did not terminate");
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(collected.len(), 9, "every record exactly once");
    let unique: std::collections::HashSet<_> = collected.iter().collect();
    assert_eq!(unique.len(), 9, "no duplicates");
}

#[tokio::test]
async fn lookup_exhausts_catalog_parts_before_serialized() {
    // Serialized twin is newer; precedence must still put catalog first.
    let cp_old = TwinBuilder::catalog(10, "MPI-A").build();
    let cp_new = TwinBuilder::catalog(20, "MPI-B").build();
    let sp = TwinBuilder::serialized(500, "SN-1").build();
    let expected = vec![cp_new.aas_urn(), cp_old.aas_urn(), sp.aas_urn()];
    let (service, _) = service_with(vec![cp_old, cp_new, sp]);

    let params = encode_params(&[("manufacturerId", support::MANUFACTURER)]);
    let page = service
        .lookup_shell_ids(STACK, &params, None, Some(10), None)
        .await
        .unwrap();

    assert_eq!(page.items, expected);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn lookup_scenario_three_catalog_one_serialized_limit_two() {
    let cp1 = TwinBuilder::catalog(30, "MPI-1").build();
    let cp2 = TwinBuilder::catalog(20, "MPI-2").build();
    let cp3 = TwinBuilder::catalog(10, "MPI-3").build();
    let sp = TwinBuilder::serialized(40, "SN-1").build();
    let expected_first = vec![cp1.aas_urn(), cp2.aas_urn()];
    let expected_second = vec![cp3.aas_urn(), sp.aas_urn()];
    let watermark = cp2.created_at;
    let (service, _) = service_with(vec![cp1, cp2, cp3, sp]);

    let params = encode_params(&[("manufacturerId", support::MANUFACTURER)]);

    let first = service
        .lookup_shell_ids(STACK, &params, None, Some(2), None)
        .await
        .unwrap();
    assert_eq!(first.items, expected_first);
    let cursor = PagingCursor::decode(first.next_cursor.as_deref().unwrap()).unwrap();
    assert_eq!(cursor.source, CursorSource::CatalogPart);
    assert_eq!(cursor.watermark, Some(watermark));

    // Second call drains the catalog source and falls through to the
    // serialized source within the same call, ending the enumeration.
    let second = service
        .lookup_shell_ids(STACK, &params, None, Some(2), first.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(second.items, expected_second);
    assert!(second.next_cursor.is_none());
}

// ============================================================================
// Lookup: degraded inputs
// ============================================================================

#[tokio::test]
async fn lookup_without_parameters_returns_empty_without_querying() {
    let (service, repo) = service_with(vec![TwinBuilder::catalog(1, "MPI-1").build()]);
    let page = service
        .lookup_shell_ids(STACK, &[], None, Some(10), None)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_none());
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn lookup_with_unknown_key_returns_empty() {
    let (service, repo) = service_with(vec![TwinBuilder::catalog(1, "MPI-1").build()]);
    let params = encode_params(&[("bogusKey", "x")]);
    let page = service
        .lookup_shell_ids(STACK, &params, None, Some(10), None)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn lookup_with_broken_cursor_returns_empty() {
    let (service, _) = service_with(vec![TwinBuilder::catalog(1, "MPI-1").build()]);
    let params = encode_params(&[("manufacturerId", support::MANUFACTURER)]);
    let page = service
        .lookup_shell_ids(STACK, &params, None, Some(10), Some("not-a-cursor"))
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn lookup_with_broken_parameter_token_is_a_validation_error() {
    let (service, _) = service_with(vec![]);
    let err = service
        .lookup_shell_ids(STACK, &["%%".to_owned()], None, Some(10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn lookup_rejects_cursor_minted_against_other_narrowing() {
    let twins = vec![
        TwinBuilder::catalog(10, "MPI-1").build(),
        TwinBuilder::catalog(20, "MPI-2").build(),
        TwinBuilder::batch(30, "B-1").build(),
    ];
    let (service, _) = service_with(twins);

    let wide = encode_params(&[("manufacturerId", support::MANUFACTURER)]);
    let first = service
        .lookup_shell_ids(STACK, &wide, None, Some(1), None)
        .await
        .unwrap();
    let catalog_cursor = first.next_cursor.unwrap();

    // The same cursor presented against a batch-only enumeration is invalid
    // and degrades to an empty page.
    let narrow = encode_params(&[("batchId", "B-1")]);
    let page = service
        .lookup_shell_ids(STACK, &narrow, None, Some(1), Some(&catalog_cursor))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn lookup_narrows_sources_by_type_specific_key() {
    let twins = vec![
        TwinBuilder::catalog(10, "MPI-1").build(),
        TwinBuilder::batch(20, "B-1").build(),
    ];
    let batch_urn = twins[1].aas_urn();
    let (service, _) = service_with(twins);

    let params = encode_params(&[("batchId", "B-1")]);
    let page = service
        .lookup_shell_ids(STACK, &params, None, Some(10), None)
        .await
        .unwrap();
    assert_eq!(page.items, vec![batch_urn]);
}

// ============================================================================
// Listing: one source per call, asset-kind narrowing
// ============================================================================

#[tokio::test]
async fn listing_drains_at_most_one_source_per_call() {
    let twins = vec![
        TwinBuilder::catalog(30, "MPI-1").build(),
        TwinBuilder::catalog(20, "MPI-2").build(),
        TwinBuilder::catalog(10, "MPI-3").build(),
        TwinBuilder::serialized(40, "SN-1").build(),
    ];
    let (service, _) = service_with(twins);

    // Page 1: full page from the catalog source, same-source cursor.
    let first = service
        .get_all_shell_descriptors(STACK, &listing(2, None))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    let cursor = PagingCursor::decode(first.next_cursor.as_deref().unwrap()).unwrap();
    assert_eq!(cursor.source, CursorSource::CatalogPart);

    // Page 2: catalog source drains; the serialized twin is NOT pulled into
    // this call. The cursor advances to the next source instead.
    let second = service
        .get_all_shell_descriptors(STACK, &listing(2, first.next_cursor.clone()))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    let cursor = PagingCursor::decode(second.next_cursor.as_deref().unwrap()).unwrap();
    assert_eq!(cursor.source, CursorSource::SerializedPart);
    assert_eq!(cursor.watermark, None);

    // Remaining calls walk the tail sources until exhaustion.
    let mut cursor_token = second.next_cursor;
    let mut rest = Vec::new();
    let mut calls = 0;
    while let Some(token) = cursor_token {
        let page = service
            .get_all_shell_descriptors(STACK, &listing(2, Some(token)))
            .await
            .unwrap();
        rest.extend(page.items);
        cursor_token = page.next_cursor;
        calls += 1;
        assert!(calls < 10, "listing did not terminate");
    }
    assert_eq!(rest.len(), 1);

    let total = first.items.len() + second.items.len() + rest.len();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn listing_filters_by_asset_kind() {
    let twins = vec![
        TwinBuilder::catalog(10, "MPI-1").build(),
        TwinBuilder::serialized(20, "SN-1").build(),
    ];
    let (service, _) = service_with(twins);

    let mut request = listing(10, None);
    request.asset_kind = Some(AssetKind::Type);
    let mut pages = Vec::new();
    let mut cursor = None;
    loop {
        let page = service
            .get_all_shell_descriptors(
                STACK,
                &ShellListingRequest {
                    cursor,
                    ..request.clone()
                },
            )
            .await
            .unwrap();
        pages.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].asset_kind, Some(AssetKind::Type));
}

#[tokio::test]
async fn listing_with_foreign_asset_type_is_empty() {
    let (service, repo) = service_with(vec![TwinBuilder::catalog(1, "MPI-1").build()]);
    let request = ShellListingRequest {
        asset_type: Some("SomethingElse".to_owned()),
        ..ShellListingRequest::default()
    };
    let page = service
        .get_all_shell_descriptors(STACK, &request)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn listing_skips_unregistered_twins() {
    let twins = vec![
        TwinBuilder::catalog(10, "MPI-1").build(),
        TwinBuilder::catalog(20, "MPI-2").unregistered().build(),
    ];
    let (service, _) = service_with(twins);

    let page = service
        .get_all_shell_descriptors(STACK, &listing(10, None))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn listing_with_broken_cursor_returns_empty() {
    let (service, _) = service_with(vec![TwinBuilder::catalog(1, "MPI-1").build()]);
    let page = service
        .get_all_shell_descriptors(STACK, &listing(10, Some("garbage!".to_owned())))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn listing_scopes_descriptors_to_requesting_partner() {
    let twins = vec![
        TwinBuilder::catalog(10, "MPI-1").build(),
        TwinBuilder::catalog(20, "MPI-2").owned_by(support::OTHER_PARTNER).build(),
    ];
    let (service, _) = service_with(twins);

    let request = ShellListingRequest {
        partner_bpn: Some(support::PARTNER.to_owned()),
        limit: Some(10),
        ..ShellListingRequest::default()
    };
    let page = service
        .get_all_shell_descriptors(STACK, &request)
        .await
        .unwrap();

    // Only the twin shared with the requesting partner is listed, and its
    // partner-scoped asset ids mention no other partner.
    assert_eq!(page.items.len(), 1);
    let ids = page.items[0].specific_asset_ids.as_ref().unwrap();
    assert!(ids.iter().all(|id| {
        id.external_subject_id
            .as_ref()
            .and_then(|r| r.first_key_value())
            .is_none_or(|subject| {
                subject == support::PARTNER || subject == aas_core::PUBLIC_READABLE
            })
    }));
}
