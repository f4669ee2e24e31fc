use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use choropleth_shared::{MapContainer, try_render_map};

use crate::config::MapConfig;
use crate::source::GlooTopologySource;

/// One choropleth map. The blank surface shows at once; the drawn map
/// replaces it when the topology arrives.
#[component]
pub fn ChoroplethMap(config: MapConfig) -> impl IntoView {
    let request = config.request();
    let markup = RwSignal::new(request.new_surface().to_markup());

    spawn_local(async move {
        let mut container = MapContainer::new();
        match try_render_map(&GlooTopologySource, &mut container, &request).await {
            Ok(_) => markup.set(container.to_markup()),
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Map render failed for {}: {e}", request.data_url()).into(),
                );
            }
        }
    });

    view! {
        <div class="map-canvas" inner_html=move || markup.get()></div>
    }
}
