//! Generates an image, then keeps editing it by pointing `context_ref` at the
//! previous output.

use studio_router::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StudioError> {
    init_observability();
    let studio = Studio::from_env()?;

    let first = studio
        .generate(GenerationRequest::new("draw a red fox sitting in fresh snow"))
        .await?;
    println!("{} produced {}", first.label(), first.kind());
    let Some(image) = first.media().cloned() else {
        println!("no image produced");
        return Ok(());
    };

    let history = vec![
        HistoryTurn::user("draw a red fox sitting in fresh snow"),
        HistoryTurn::assistant("").with_media(image.clone()),
    ];
    let edit = GenerationRequest::new("give the fox a small blue scarf")
        .history(history)
        .context_ref(image.content_id());
    match studio.respond(edit).await {
        ResponseEnvelope::Data(result) => {
            println!("{} ({}) edited the image", result.label(), result.model())
        }
        ResponseEnvelope::Error(message) => println!("edit failed: {message}"),
    }
    Ok(())
}
