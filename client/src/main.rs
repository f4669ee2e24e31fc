mod config;
mod map;
mod source;

use leptos::mount::mount_to;
use leptos::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

use crate::config::MapConfig;
use crate::map::ChoroplethMap;

thread_local! {
    static MAP_MOUNT_HANDLES: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let Ok(targets) = document.query_selector_all(".map") else {
        return;
    };

    MAP_MOUNT_HANDLES.with(move |slot| {
        // Drop mounts from an earlier run so stale signals stop updating.
        slot.borrow_mut().clear();
        for index in 0..targets.length() {
            let Some(target) = targets
                .item(index)
                .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
            else {
                continue;
            };
            let config = match MapConfig::from_attributes(|name| target.get_attribute(name)) {
                Ok(config) => config,
                Err(e) => {
                    web_sys::console::warn_1(&format!("Skipping map element: {e}").into());
                    continue;
                }
            };
            let handle = mount_to(target, move || view! { <ChoroplethMap config=config /> });
            slot.borrow_mut().push(Box::new(handle));
        }
    });
}
