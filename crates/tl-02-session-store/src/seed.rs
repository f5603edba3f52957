//! # Deterministic Seed Data
//!
//! Inserted once at first startup per replica. The seed must be identical
//! across replicas so that replay is deterministic from genesis; both
//! adapters source it from these functions.

use shared_types::{CatalogItem, CourierRecord, OperatorRecord, SupplierRecord};

pub fn operators() -> Vec<OperatorRecord> {
    vec![
        OperatorRecord {
            id: "OPR-001".into(),
            name: "Dewi Lestari".into(),
        },
        OperatorRecord {
            id: "OPR-002".into(),
            name: "Budi Santoso".into(),
        },
        OperatorRecord {
            id: "OPR-003".into(),
            name: "Siti Rahma".into(),
        },
    ]
}

pub fn suppliers() -> Vec<SupplierRecord> {
    vec![
        SupplierRecord {
            id: "SUP-001".into(),
            name: "Nusantara Fresh Produce".into(),
        },
        SupplierRecord {
            id: "SUP-002".into(),
            name: "Archipelago Estates".into(),
        },
    ]
}

pub fn couriers() -> Vec<CourierRecord> {
    vec![
        CourierRecord {
            id: "COU-001".into(),
            name: "Garuda Express".into(),
        },
        CourierRecord {
            id: "COU-002".into(),
            name: "Samudra Logistics".into(),
        },
    ]
}

pub fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem {
            id: "CAT-001".into(),
            name: "Arabica beans 1kg".into(),
            default_quantity: 10,
        },
        CatalogItem {
            id: "CAT-002".into(),
            name: "Robusta beans 1kg".into(),
            default_quantity: 5,
        },
        CatalogItem {
            id: "CAT-003".into(),
            name: "Burlap sack".into(),
            default_quantity: 2,
        },
    ]
}
