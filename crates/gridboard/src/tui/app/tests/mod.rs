pub(crate) use super::*;
pub(crate) use crate::state::MemoryStorage;
pub(crate) use crate::surface::ContentState;


pub(crate) const LAYOUT_KEY: &str = "gridboard.layout";

/// A started app on a 120x41 terminal with its first tick run.
pub(crate) fn make_app(storage: &Rc<MemoryStorage>) -> App {
    let mut app = App::new(Config::default(), storage.clone(), 120, 41);
    app.start();
    app.tick(Duration::ZERO);
    app
}

pub(crate) fn is_ready(app: &App, id: &str) -> bool {
    matches!(
        app.surface.borrow().container(id).map(|c| &c.content),
        Some(ContentState::Ready(_))
    )
}
