//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two should delegate to the engine APIs. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and gateway call is therefore awaited, never
//! blocked on.
//!
//! ## Routes
//! * `GET /health`
//! * `POST /payment/notification` - signed payment notifications pushed by the gateway.
//! * `POST /payment/manual-verify/{order_id}` - admin override that settles an order directly.
//! * `GET /payment/check-status/{order_id}` - asks the gateway for the payment status and settles if it is final.
//! * `GET /orders/{order_id}` - an order with its items and tracking history.
//! * `PATCH /orders/{order_id}/status` - role-gated order status transitions.
//! * `GET /admin/treasury`, `GET /admin/payouts`, `GET /admin/payouts/{id}`, `POST /admin/payouts/{id}/complete` and
//!   `POST /admin/payouts/{id}/fail` - treasury administration.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use settlement_engine::{
    db_types::{OrderId, OrderStatusType, Role},
    engine_api::payment_objects::{ManualVerifyResult, PaymentNotification},
    payment_provider::PaymentStatusProvider,
    traits::{OrderManagement, SettlementDatabase, TreasuryManagement},
    OrderLifecycleApi,
    PaymentFlowApi,
    TreasuryApi,
};

use crate::{
    auth::AuthenticatedPrincipal,
    config::ServerOptions,
    data_objects::{JsonResponse, PayoutQuery, StatusUpdateRequest},
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each trait bound listed after `impl` becomes one type parameter of the handler, in the same order.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(payment_notification => Post "/payment/notification" impl SettlementDatabase, PaymentStatusProvider);
/// Receives the gateway's payment notifications.
///
/// The body is the gateway's notification JSON. Its `signature_key` must match the hash of the order id, status
/// code, gross amount and server key, otherwise the request is rejected with a 403 before anything is looked up.
/// Notifications for payments with no local orders get a 404. Everything else, including re-delivered
/// notifications, is acknowledged with a 200 so that the gateway stops retrying.
pub async fn payment_notification<B, P>(
    req: HttpRequest,
    options: web::Data<ServerOptions>,
    api: web::Data<PaymentFlowApi<B, P>>,
    body: web::Json<PaymentNotification>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: PaymentStatusProvider,
{
    trace!("💻️ Received payment notification");
    check_gateway_peer(&req, options.as_ref())?;
    let notification = body.into_inner();
    let result = api.handle_notification(&notification).await?;
    let message = format!(
        "Processed {} notification for payment {}. {} of {} orders settled.",
        result.transaction_status,
        result.payment_id,
        result.settled_count(),
        result.orders.len()
    );
    debug!("💻️ {message}");
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

fn check_gateway_peer(req: &HttpRequest, options: &ServerOptions) -> Result<(), ServerError> {
    let Some(whitelist) = &options.gateway_whitelist else {
        return Ok(());
    };
    match get_remote_ip(req, options.use_x_forwarded_for, options.use_forwarded) {
        Some(ip) if whitelist.contains(&ip) => {
            debug!("💻️ Payment notification from {ip}");
            Ok(())
        },
        Some(ip) => {
            warn!("💻️ Payment notification from {ip}, which is not whitelisted. The request is rejected.");
            Err(AuthError::ForbiddenPeer.into())
        },
        None => {
            warn!("💻️ Could not determine the remote IP address for a payment notification. The request is rejected.");
            Err(AuthError::ForbiddenPeer.into())
        },
    }
}

route!(manual_verify => Post "/payment/manual-verify/{order_id}" impl SettlementDatabase, PaymentStatusProvider where requires [Role::Admin]);
/// Settles an order without consulting the gateway. Administrators use this when they have confirmed a payment by
/// other means.
pub async fn manual_verify<B, P>(
    path: web::Path<OrderId>,
    api: web::Data<PaymentFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: PaymentStatusProvider,
{
    let order_id = path.into_inner();
    info!("💻️ Manual verification requested for order {order_id}");
    let receipt = api.manual_verify(&order_id).await?;
    Ok(HttpResponse::Ok().json(ManualVerifyResult { order_id, receipt }))
}

route!(check_status => Get "/payment/check-status/{order_id}" impl SettlementDatabase, PaymentStatusProvider);
/// Polls the gateway for the payment status of an order. The path segment may be the order id or the payment id.
///
/// If the gateway reports a final payment, the order and any unpaid orders sharing its payment are settled. If the
/// gateway cannot be reached, the local status is returned and nothing changes.
pub async fn check_status<B, P>(
    principal: AuthenticatedPrincipal,
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: PaymentStatusProvider,
{
    let id = path.into_inner();
    debug!("💻️ GET check_status({id}) for {}", principal.id);
    let result = api.check_status(&id, &principal).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
/// Fetches an order with its line items and tracking history.
///
/// Admins may see any order. Buyers see their own orders and sellers see the orders of their store. Orders that are
/// still awaiting payment are only visible to admins.
pub async fn order_by_id<B: OrderManagement>(
    principal: AuthenticatedPrincipal,
    path: web::Path<OrderId>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order_by_id({order_id}) for {}", principal.id);
    let not_found = || ServerError::NoRecordFound(format!("Order {order_id} does not exist"));
    let order = api.db().fetch_full_order(&order_id).await?.ok_or_else(not_found)?;
    if !principal.is_admin() && order.order.status == OrderStatusType::AwaitingPayment {
        return Err(not_found());
    }
    if !principal.can_view(&order.order) {
        return Err(ServerError::InsufficientPermissions(format!("Order {order_id} does not belong to you")));
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{order_id}/status" impl OrderManagement);
/// Moves an order along its lifecycle. Sellers ship, buyers confirm delivery or cancel before shipping, and admins may
/// do all of these.
pub async fn update_order_status<B: OrderManagement>(
    principal: AuthenticatedPrincipal,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let StatusUpdateRequest { status } = body.into_inner();
    debug!("💻️ PATCH update_order_status({order_id}, {status}) for {}", principal.id);
    let order = api.update_status(&principal, &order_id, &status).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Treasury  ----------------------------------------------------
route!(treasury => Get "/admin/treasury" impl TreasuryManagement where requires [Role::Admin]);
pub async fn treasury<B: TreasuryManagement>(api: web::Data<TreasuryApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET treasury");
    let treasury = api.treasury().await?;
    Ok(HttpResponse::Ok().json(treasury))
}

route!(payouts => Get "/admin/payouts" impl TreasuryManagement where requires [Role::Admin]);
/// Lists payouts, newest first. Pass `store_id` to see one store's payouts.
pub async fn payouts<B: TreasuryManagement>(
    query: web::Query<PayoutQuery>,
    api: web::Data<TreasuryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PayoutQuery { store_id } = query.into_inner();
    trace!("💻️ GET payouts({store_id:?})");
    let payouts = api.payouts(store_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(payouts))
}

route!(payout_by_id => Get "/admin/payouts/{id}" impl TreasuryManagement where requires [Role::Admin]);
pub async fn payout_by_id<B: TreasuryManagement>(
    path: web::Path<i64>,
    api: web::Data<TreasuryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET payout_by_id({id})");
    let payout = api.payout(id).await?;
    Ok(HttpResponse::Ok().json(payout))
}

route!(complete_payout => Post "/admin/payouts/{id}/complete" impl TreasuryManagement where requires [Role::Admin]);
/// Marks a pending payout as paid out. The amount moves from the pending seller balance to the payout total.
pub async fn complete_payout<B: TreasuryManagement>(
    path: web::Path<i64>,
    api: web::Data<TreasuryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Completing payout {id}");
    let payout = api.complete_payout(id).await?;
    Ok(HttpResponse::Ok().json(payout))
}

route!(fail_payout => Post "/admin/payouts/{id}/fail" impl TreasuryManagement where requires [Role::Admin]);
pub async fn fail_payout<B: TreasuryManagement>(
    path: web::Path<i64>,
    api: web::Data<TreasuryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Marking payout {id} as failed");
    let payout = api.fail_payout(id).await?;
    Ok(HttpResponse::Ok().json(payout))
}
