//! Markup fragments written into the dashboard document
//!
//! Controls carry a `data-action` attribute instead of inline handlers; the
//! front end dispatches on it (`choose-image`, `upload`, `analyze`).

/// Initial upload prompt shown in the image container
pub fn upload_prompt() -> String {
    r#"<div class="upload-area" id="uploadArea">
    <i class='bx bx-image'></i>
    <p>Upload an image to analyze leaf count</p>
    <div class="button-group">
        <button class="upload-btn" data-action="choose-image">
            <i class='bx bx-upload'></i> Choose Image
        </button>
    </div>
    <input type="file" id="imageInput" accept="image/*" data-action="upload">
</div>"#
        .to_string()
}

/// Image preview with the re-upload and analyze actions
pub fn image_preview(src: &str) -> String {
    format!(
        r#"<img src="{}" alt="Uploaded plant image" class="uploaded-image">
<div class="button-group">
    <button class="upload-btn" data-action="choose-image">
        <i class='bx bx-upload'></i> Choose New Image
    </button>
    <button class="analysis-btn" data-action="analyze">
        <i class='bx bx-search-alt'></i> Analyze Leaves
    </button>
</div>"#,
        escape_attr(src)
    )
}

/// Transient "in progress" marker for a result field
pub fn analyzing(label: &str) -> String {
    format!(r#"<span class="analyzing">{}</span>"#, label)
}

/// Label of a device toggle button
pub fn button_label(icon: &str, label: &str) -> String {
    format!(r#"<i class="bx {}"></i><span>{}</span>"#, icon, label)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
