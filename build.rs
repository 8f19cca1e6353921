fn main() {
    // Embed the window icon into the Windows executable
    #[cfg(target_os = "windows")]
    {
        if std::path::Path::new("assets/r1.ico").exists() {
            let mut res = winres::WindowsResource::new();
            res.set_icon("assets/r1.ico");

            if let Err(e) = res.compile() {
                eprintln!("Warning: Failed to embed icon: {}", e);
            }
        }
    }
}
