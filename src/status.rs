//! Order lifecycle, payment methods and shipment tracking vocabulary.
//!
//! Values are stored as snake_case text columns; `as_str` and `FromStr`
//! are the only conversions between the two.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

macro_rules! text_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::BadRequest(format!(
                        concat!("unknown ", $label, " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

text_enum!(OrderStatus, "order status" {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Completed => "completed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Cancelled)
                | (Paid, Processing | Cancelled | Refunded)
                | (Processing, Shipped | Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Completed | Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Whether the customer may still cancel on their own.
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Tracking event appended when an order enters this status.
    pub fn tracking_event(self) -> Option<TrackingEventType> {
        match self {
            OrderStatus::Paid => Some(TrackingEventType::PaymentReceived),
            OrderStatus::Processing => Some(TrackingEventType::Processing),
            OrderStatus::Shipped => Some(TrackingEventType::Shipped),
            OrderStatus::Delivered => Some(TrackingEventType::Delivered),
            OrderStatus::Cancelled => Some(TrackingEventType::Cancelled),
            OrderStatus::Refunded => Some(TrackingEventType::Refunded),
            OrderStatus::Pending | OrderStatus::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
}

text_enum!(PaymentMethod, "payment method" {
    CreditCard => "credit_card",
    DebitCard => "debit_card",
    Paypal => "paypal",
    BankTransfer => "bank_transfer",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEventType {
    OrderCreated,
    PaymentReceived,
    OrderConfirmed,
    Processing,
    Packed,
    Shipped,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

text_enum!(TrackingEventType, "tracking event" {
    OrderCreated => "order_created",
    PaymentReceived => "payment_received",
    OrderConfirmed => "order_confirmed",
    Processing => "processing",
    Packed => "packed",
    Shipped => "shipped",
    InTransit => "in_transit",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl TrackingEventType {
    pub fn progress_percentage(self) -> u8 {
        use TrackingEventType::*;
        match self {
            OrderCreated => 10,
            PaymentReceived => 20,
            OrderConfirmed => 30,
            Processing => 40,
            Packed => 50,
            Shipped => 60,
            InTransit => 80,
            OutForDelivery => 90,
            Delivered => 100,
            Cancelled | Refunded => 0,
        }
    }

    /// Expected hours until delivery once a shipment reaches this stage;
    /// `None` when the shipment is finished.
    pub fn delivery_hours(self) -> Option<i64> {
        use TrackingEventType::*;
        match self {
            OrderCreated => Some(168),
            PaymentReceived => Some(144),
            OrderConfirmed => Some(120),
            Processing => Some(96),
            Packed => Some(72),
            Shipped => Some(48),
            InTransit => Some(24),
            OutForDelivery => Some(12),
            Delivered | Cancelled | Refunded => None,
        }
    }

    pub fn default_description(self) -> &'static str {
        use TrackingEventType::*;
        match self {
            OrderCreated => "Order created",
            PaymentReceived => "Payment received",
            OrderConfirmed => "Order confirmed",
            Processing => "Order is being processed",
            Packed => "Order packed",
            Shipped => "Order shipped",
            InTransit => "Parcel in transit",
            OutForDelivery => "Out for delivery",
            Delivered => "Delivered",
            Cancelled => "Order cancelled",
            Refunded => "Order refunded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        use OrderStatus::*;
        let path = [Pending, Paid, Processing, Shipped, Delivered, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_do_not_move() {
        for from in [OrderStatus::Completed, OrderStatus::Cancelled, OrderStatus::Refunded] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(*to));
            }
        }
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(OrderStatus::Paid.is_cancellable());
    }

    #[test]
    fn text_round_trip_and_unknown_values() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert!("archived".parse::<OrderStatus>().is_err());
        assert_eq!(
            "out_for_delivery".parse::<TrackingEventType>().unwrap(),
            TrackingEventType::OutForDelivery
        );
    }

    #[test]
    fn progress_and_delivery_windows() {
        assert_eq!(TrackingEventType::Shipped.progress_percentage(), 60);
        assert_eq!(TrackingEventType::Delivered.progress_percentage(), 100);
        assert_eq!(TrackingEventType::OutForDelivery.delivery_hours(), Some(12));
        assert_eq!(TrackingEventType::Refunded.delivery_hours(), None);
    }

    #[test]
    fn completed_has_no_tracking_event() {
        assert_eq!(OrderStatus::Completed.tracking_event(), None);
        assert_eq!(
            OrderStatus::Paid.tracking_event(),
            Some(TrackingEventType::PaymentReceived)
        );
    }
}
