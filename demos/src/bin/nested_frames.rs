//! Вложенные фреймы: страница, виджет с собственным Agent-ом и фреймы
//! внутри виджета.
//!
//! Каждый Bus разговаривает с ближайшим родителем, поэтому подписки
//! внутреннего фрейма видит Agent виджета, а не страницы. Виджет
//! пробрасывает событие наверх через собственный Bus.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use framebus::{Agent, Bus, BusError, EventLoop, MessageHost, Window};
use serde_json::json;
use tokio::sync::oneshot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BusError> {
    println!("=== framebus: nested frames ===\n");

    let el = EventLoop::new();
    let page = Window::new(&el, "https://page.local");
    let page_agent = Agent::new(page.clone())?;

    let widget = page.create_frame("https://widget.local");
    let widget_agent = Agent::new(widget.clone())?;
    let widget_bus = Bus::new(widget.clone())?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let driver = {
        let el = el.clone();
        tokio::spawn(async move {
            el.run_until(async {
                let _ = stop_rx.await;
            })
            .await;
        })
    };

    // Страница слушает события виджета.
    let seen_by_page = Arc::new(AtomicUsize::new(0));
    {
        let seen = seen_by_page.clone();
        page_agent.on("widget:clicked", move |payload, _| {
            seen.fetch_add(1, Ordering::Relaxed);
            println!("[page]   widget reported click {payload}");
        });
    }

    // Внутренние фреймы виджета подписываются на "theme".
    let inner: Vec<(Window, Bus)> = (0..2)
        .map(|i| {
            let frame = widget.create_frame(format!("https://inner-{i}.local"));
            let bus = Bus::new(frame.clone())?;
            let origin = frame.origin().to_string();
            bus.on("theme", move |payload| {
                println!("[{origin}] theme changed to {payload}");
            })?;
            Ok::<_, BusError>((frame, bus))
        })
        .collect::<Result<_, BusError>>()?;

    // Кнопка внутри первого фрейма срабатывает один раз.
    inner[0].1.once("click", |payload| {
        println!("[inner-0] click handled once: {payload}");
    })?;

    tokio::time::sleep(Duration::from_millis(10)).await;
    println!(
        "widget agent: theme={} click={}, page agent: theme={}",
        widget_agent.listener_count("theme"),
        widget_agent.listener_count("click"),
        page_agent.listener_count("theme"),
    );

    widget_agent.publish("theme", json!("dark"));
    widget_agent.publish("click", json!({"x": 10}));
    widget_agent.publish("click", json!({"x": 20}));
    widget_bus.send_to_agent("widget:clicked", json!({"count": 2}));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let _ = stop_tx.send(());
    if driver.await.is_err() {
        eprintln!("event loop driver panicked");
    }

    println!(
        "\nclick subscriptions left in widget: {}",
        widget_agent.listener_count("click")
    );
    println!(
        "events seen by page: {}",
        seen_by_page.load(Ordering::Relaxed)
    );
    for (frame, bus) in &inner {
        println!("{} -> {:?}", frame.origin(), bus.stats());
    }
    println!("\n=== done ===");
    Ok(())
}
