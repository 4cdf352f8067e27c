mod request;

use crate::error::ErrorStatus;
use crate::extractor::Actor;
use crate::handler::AppModule;
use crate::route::ride::response::RideResponse;
use crate::route::view::request::HistoryRequest;
use application::service::RideViewService;
use application::transfer::{HistoryFilterDto, WatchViewDto};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::Query;
use futures::StreamExt;

/// Live views, served as Server-Sent Events.
///
/// Each connection owns one subscription; the full recomputed snapshot is
/// sent on every upstream change and closing the connection drops the
/// subscription.
pub trait ViewRouter {
    fn route_view(self) -> Self;
}

impl ViewRouter for Router<AppModule> {
    fn route_view(self) -> Self {
        self.route(
            "/views/next",
            get(
                |State(module): State<AppModule>, Actor(user_id): Actor| async move {
                    let snapshots = module
                        .store()
                        .watch_next_ride(WatchViewDto { user_id })
                        .await
                        .map_err(ErrorStatus::from)?;
                    let events = snapshots
                        .map(|view| Event::default().json_data(view.map(RideResponse::from)));
                    Ok::<_, ErrorStatus>(Sse::new(events).keep_alive(KeepAlive::default()))
                },
            ),
        )
        .route(
            "/views/upcoming",
            get(
                |State(module): State<AppModule>, Actor(user_id): Actor| async move {
                    let snapshots = module
                        .store()
                        .watch_upcoming(WatchViewDto { user_id })
                        .await
                        .map_err(ErrorStatus::from)?;
                    let events = snapshots.map(|rides| {
                        Event::default().json_data(
                            rides
                                .into_iter()
                                .map(RideResponse::from)
                                .collect::<Vec<_>>(),
                        )
                    });
                    Ok::<_, ErrorStatus>(Sse::new(events).keep_alive(KeepAlive::default()))
                },
            ),
        )
        .route(
            "/views/history",
            get(
                |State(module): State<AppModule>,
                 Actor(user_id): Actor,
                 Query(req): Query<HistoryRequest>| async move {
                    let snapshots = module
                        .store()
                        .watch_history(HistoryFilterDto {
                            user_id,
                            status: req.status,
                            date: req.date,
                        })
                        .await
                        .map_err(ErrorStatus::from)?;
                    let events = snapshots.map(|rides| {
                        Event::default().json_data(
                            rides
                                .into_iter()
                                .map(RideResponse::from)
                                .collect::<Vec<_>>(),
                        )
                    });
                    Ok::<_, ErrorStatus>(Sse::new(events).keep_alive(KeepAlive::default()))
                },
            ),
        )
        .route(
            "/views/open",
            get(
                |State(module): State<AppModule>, Actor(user_id): Actor| async move {
                    let snapshots = module
                        .store()
                        .watch_open_rides(WatchViewDto { user_id })
                        .await
                        .map_err(ErrorStatus::from)?;
                    let events = snapshots.map(|rides| {
                        Event::default().json_data(
                            rides
                                .into_iter()
                                .map(RideResponse::from)
                                .collect::<Vec<_>>(),
                        )
                    });
                    Ok::<_, ErrorStatus>(Sse::new(events).keep_alive(KeepAlive::default()))
                },
            ),
        )
    }
}
