use std::sync::Arc;
use courier_dispatch::DispatchService;

#[derive(Clone)]
pub struct AppState {
    pub dispatch: Arc<DispatchService>,
}

impl AppState {
    pub fn new(dispatch: DispatchService) -> Self {
        Self { dispatch: Arc::new(dispatch) }
    }
}
