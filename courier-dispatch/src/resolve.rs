//! Best-available recipient data.
//!
//! Delivery details can live on the shipment snapshot, on the order's
//! contact snapshot or on the linked customer. Each resolver walks its
//! sources in a fixed precedence and reports which one won, so stale data
//! is never picked silently. Blank strings count as absent.

use courier_core::Order;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldSource {
    Shipment,
    OrderContact,
    Customer,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: FieldSource,
}

pub const DEFAULT_RECIPIENT_NAME: &str = "Customer";

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_present<'a>(candidates: impl IntoIterator<Item = (Option<&'a str>, FieldSource)>) -> Option<Resolved> {
    candidates
        .into_iter()
        .find_map(|(value, source)| present(value).map(|value| Resolved { value, source }))
}

/// Shipment recipient phone, then the order's contact snapshot, then the customer.
pub fn recipient_phone(order: &Order) -> Option<Resolved> {
    first_present([
        (order.shipment.as_ref().and_then(|s| s.recipient_phone.as_deref()), FieldSource::Shipment),
        (order.customer_phone.as_deref(), FieldSource::OrderContact),
        (order.customer.as_ref().and_then(|c| c.phone.as_deref()), FieldSource::Customer),
    ])
}

/// Shipment recipient name, then the customer's full name, then "Customer".
pub fn recipient_name(order: &Order) -> Resolved {
    let customer_name = order.customer.as_ref().map(|c| c.full_name());
    first_present([
        (order.shipment.as_ref().and_then(|s| s.recipient_name.as_deref()), FieldSource::Shipment),
        (customer_name.as_deref(), FieldSource::Customer),
    ])
    .unwrap_or_else(|| Resolved {
        value: DEFAULT_RECIPIENT_NAME.to_string(),
        source: FieldSource::Default,
    })
}

/// Address lines are only ever captured on the shipment snapshot.
pub fn address_line1(order: &Order) -> Option<Resolved> {
    first_present([(order.shipment.as_ref().and_then(|s| s.address_line1.as_deref()), FieldSource::Shipment)])
}

pub fn address_city(order: &Order) -> Option<Resolved> {
    first_present([(order.shipment.as_ref().and_then(|s| s.address_city.as_deref()), FieldSource::Shipment)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Customer, NewShipment, ProviderKey, ShipmentStatus};
    use uuid::Uuid;

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            order_number: "1001".to_string(),
            customer_phone: None,
            shipment: None,
            customer: None,
            delivery_settings: None,
        }
    }

    fn shipment_for(order: &Order, phone: Option<&str>, name: Option<&str>) -> courier_core::Shipment {
        NewShipment {
            store_id: order.store_id,
            order_id: order.id,
            provider: ProviderKey::Manual,
            status: ShipmentStatus::Draft,
            recipient_name: name.map(str::to_string),
            recipient_phone: phone.map(str::to_string),
            address_line1: Some("5 Bode Thomas St".to_string()),
            address_city: None,
            tracking_code: None,
            tracking_url: None,
            notes: None,
        }
        .into_shipment()
    }

    fn customer(phone: Option<&str>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Obi".to_string()),
            phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn test_phone_precedence() {
        let mut o = order();
        o.customer = Some(customer(Some("0803-customer")));
        assert_eq!(recipient_phone(&o).unwrap().source, FieldSource::Customer);

        o.customer_phone = Some("0802-contact".to_string());
        assert_eq!(recipient_phone(&o).unwrap().value, "0802-contact");

        o.shipment = Some(shipment_for(&o, Some("0801-shipment"), None));
        let resolved = recipient_phone(&o).unwrap();
        assert_eq!(resolved.value, "0801-shipment");
        assert_eq!(resolved.source, FieldSource::Shipment);
    }

    #[test]
    fn test_blank_values_fall_through() {
        let mut o = order();
        o.customer_phone = Some("   ".to_string());
        o.customer = Some(customer(Some("0803-customer")));
        o.shipment = Some(shipment_for(&o, Some(""), None));

        assert_eq!(recipient_phone(&o).unwrap().value, "0803-customer");
    }

    #[test]
    fn test_missing_phone() {
        assert!(recipient_phone(&order()).is_none());
    }

    #[test]
    fn test_name_precedence() {
        let mut o = order();
        assert_eq!(recipient_name(&o).value, "Customer");
        assert_eq!(recipient_name(&o).source, FieldSource::Default);

        o.customer = Some(customer(None));
        assert_eq!(recipient_name(&o).value, "Ada Obi");

        o.shipment = Some(shipment_for(&o, None, Some("Front Desk")));
        assert_eq!(recipient_name(&o).value, "Front Desk");
    }

    #[test]
    fn test_address_comes_from_shipment_only() {
        let mut o = order();
        assert!(address_line1(&o).is_none());
        o.shipment = Some(shipment_for(&o, None, None));
        assert_eq!(address_line1(&o).unwrap().value, "5 Bode Thomas St");
        assert!(address_city(&o).is_none());
    }
}
