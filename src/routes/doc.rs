use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            AccessToken, AuthTokens, ChangePasswordRequest, LoginRequest, RefreshRequest,
            RegisterRequest, TokenInfo, UpdateProfileRequest,
        },
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
        customers::{AdminUpdateCustomerRequest, CustomerList},
        orders::{CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CreateProductRequest, InventoryAdjustRequest, NameList, ProductList,
            UpdateProductRequest,
        },
        tracking::{
            AddTrackingEventRequest, DeliveryEstimate, TrackingList, TrackingSummary,
            TrackingSummaryList,
        },
    },
    models::{Order, OrderItem, OrderTracking, Product, ShippingAddress, TrackingEvent, User},
    pricing::CartTotals,
    response::{ApiResponse, Empty, Meta},
    routes::{admin, auth, cart, customers, health, orders, params, products, tracking},
    status::{OrderStatus, PaymentMethod, TrackingEventType},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "AWE Electronics Storefront API"),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::profile,
        auth::update_profile,
        auth::change_password,
        auth::logout,
        auth::verify,
        products::list_products,
        products::get_product,
        products::list_categories,
        products::list_manufacturers,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::get_cart,
        cart::cart_summary,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::get_order_by_number,
        orders::pay_order,
        orders::cancel_order,
        tracking::tracking_summary,
        tracking::order_tracking,
        tracking::tracking_by_order_number,
        tracking::tracking_by_tracking_number,
        tracking::delivery_estimate,
        tracking::add_tracking_event,
        tracking::search_tracking,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        customers::search_customers,
        customers::get_customer,
        customers::customer_orders,
        customers::update_customer,
        customers::deactivate_customer,
    ),
    components(
        schemas(
            User,
            Product,
            ShippingAddress,
            Order,
            OrderItem,
            OrderTracking,
            TrackingEvent,
            OrderStatus,
            PaymentMethod,
            TrackingEventType,
            CartTotals,
            CartLine,
            CartView,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthTokens,
            AccessToken,
            UpdateProfileRequest,
            ChangePasswordRequest,
            TokenInfo,
            CreateProductRequest,
            UpdateProductRequest,
            InventoryAdjustRequest,
            ProductList,
            NameList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            AddTrackingEventRequest,
            TrackingSummary,
            TrackingSummaryList,
            DeliveryEstimate,
            TrackingList,
            AdminUpdateCustomerRequest,
            CustomerList,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            Empty,
            health::HealthData,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<OrderTracking>,
            ApiResponse<User>,
            ApiResponse<AuthTokens>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog browsing and admin maintenance"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Checkout and customer orders"),
        (name = "Tracking", description = "Shipment tracking"),
        (name = "Admin", description = "Order fulfilment and inventory"),
        (name = "Customers", description = "Customer management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
