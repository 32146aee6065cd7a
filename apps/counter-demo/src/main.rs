use std::time::Duration;

use weft_core::{
    Element, HostAdapter, HostEvent, MemoryHost, NodeId, NodeSpec, Progress, Props, Runtime,
    Scope, TimeSlice,
};

const FRAME_BUDGET: Duration = Duration::from_millis(8);

/// Controlled text input plus a greeting line derived from it.
fn greeter(scope: &mut Scope<'_>, _props: &Props) -> Element {
    let (name, set_name) = scope.use_state(String::from("world"));
    let on_input = move |event: &HostEvent| {
        if let Some(text) = event.detail_text() {
            set_name.set(text.to_owned());
        }
    };
    Element::host(
        "section",
        Props::new(),
        [
            Element::host(
                "input",
                Props::new().attr("value", name.clone()).on("input", on_input),
                Vec::<Element>::new(),
            ),
            Element::host("h2", Props::new(), [format!("Hello, {name}!")]),
        ],
    )
}

fn counter(scope: &mut Scope<'_>, _props: &Props) -> Element {
    let (count, set_count) = scope.use_state(0i64);
    let on_click = move |_: &HostEvent| set_count.update(|n| n + 1);
    Element::host(
        "button",
        Props::new().attr("title", "increment").on("click", on_click),
        [Element::text(format!("Count: {count}"))],
    )
}

fn app(_scope: &mut Scope<'_>, _props: &Props) -> Element {
    Element::host(
        "main",
        Props::new().attr("id", "demo"),
        [
            Element::component(greeter, Props::new()),
            Element::component(counter, Props::new()),
        ],
    )
}

fn main() {
    env_logger::init();

    println!("=== weft counter demo ===");
    println!("Headless run against the in-memory host:");
    println!("  - renders are sliced on an 8ms frame budget");
    println!("  - click and input events drive hook state");
    println!();

    let mut host = MemoryHost::new();
    let container = host.create_node(NodeSpec::Tag("root")).expect("container");
    let mut runtime = Runtime::new(host);
    runtime.set_waker(|| log::debug!("render requested"));

    runtime.render(Element::component(app, Props::new()), container);
    pump(&mut runtime);
    println!("initial tree:\n{}", runtime.host().dump_tree(container));

    let button = find_by_tag(&runtime, container, "button").expect("button rendered");
    for _ in 0..3 {
        runtime
            .host()
            .emit(button, &HostEvent::new("click"))
            .expect("emit click");
        pump(&mut runtime);
    }

    let input = find_by_tag(&runtime, container, "input").expect("input rendered");
    runtime
        .host()
        .emit(input, &HostEvent::with_detail("input", "weft"))
        .expect("emit input");
    pump(&mut runtime);

    println!(
        "after three clicks and a rename:\n{}",
        runtime.host().dump_tree(container)
    );
}

/// Drive the runtime the way a frame loop would: one bounded slice per
/// iteration until it reports idle.
fn pump(runtime: &mut Runtime<MemoryHost>) {
    let mut slices = 0usize;
    loop {
        let progress = runtime
            .step(&TimeSlice::new(FRAME_BUDGET))
            .expect("render failed");
        slices += 1;
        if progress == Progress::Idle {
            break;
        }
    }
    log::info!("idle after {slices} slice(s)");
}

/// First node with the given tag, depth first.
fn find_by_tag(runtime: &Runtime<MemoryHost>, from: NodeId, tag: &str) -> Option<NodeId> {
    let host = runtime.host();
    if host.tag_of(from).ok()? == Some(tag) {
        return Some(from);
    }
    for child in host.children_of(from).ok()?.to_vec() {
        if let Some(found) = find_by_tag(runtime, child, tag) {
            return Some(found);
        }
    }
    None
}
