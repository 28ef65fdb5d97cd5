#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::io::Read;
    use std::path::{Path, PathBuf};

    use anyhow::{Context, anyhow};
    use clap::Parser;
    use fallblocks::leaderboard::{LockPolicy, ScoreStore, ScoreSubmission};
    use serde_json::{Value, json};
    use tiny_http::{Header, Method, Request, Response, ResponseBox, Server, StatusCode};

    const MAX_BODY: u64 = 16 * 1024;

    /// High-score service and static host for the browser game.
    #[derive(Parser, Debug)]
    struct Opts {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        listen: String,
        /// Replaces the port of --listen
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        /// Directory with index.html, the wasm bundle and other assets
        #[arg(long, default_value = "public")]
        public_dir: PathBuf,
        /// Directory holding scores.csv and its lock file
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    }

    impl Opts {
        fn addr(&self) -> String {
            match self.port {
                Some(port) => {
                    let host = self.listen.rsplit_once(':').map_or(self.listen.as_str(), |(h, _)| h);
                    format!("{host}:{port}")
                }
                None => self.listen.clone(),
            }
        }
    }

    pub fn run() -> anyhow::Result<()> {
        let opts = Opts::parse();
        let store = ScoreStore::new(&opts.data_dir, LockPolicy::default());
        store
            .init()
            .with_context(|| format!("score file {} is not usable", store.path().display()))?;
        let root = fs::canonicalize(&opts.public_dir)
            .with_context(|| format!("public directory {} not found", opts.public_dir.display()))?;

        let addr = opts.addr();
        let server = Server::http(&addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
        println!("Serving {} on http://{}", root.display(), addr);
        println!("Scores saved to {}", store.path().display());
        println!("Lock file {}", store.lock_path().display());

        for request in server.incoming_requests() {
            let url = request.url().to_string();
            let method = request.method().to_string();
            let status = handle(request, &store, &root);
            println!("{} {} -> {}", method, url, status);
        }
        Ok(())
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Route<'a> {
        SubmitScore,
        ListScores,
        Preflight,
        Page(&'a str),
        NotAllowed,
    }

    /// Unmatched non-GET requests get 405; every GET falls through to the
    /// static files.
    fn route<'a>(method: &Method, path: &'a str) -> Route<'a> {
        match (method, path) {
            (Method::Post, "/api/score") => Route::SubmitScore,
            (Method::Get, "/api/scores") => Route::ListScores,
            (Method::Options, p) if p.starts_with("/api/") => Route::Preflight,
            (Method::Get, "/leaderboard") => Route::Page("leaderboard.html"),
            (Method::Get, p) => Route::Page(p),
            _ => Route::NotAllowed,
        }
    }

    fn handle(mut request: Request, store: &ScoreStore, root: &Path) -> u16 {
        let path = request.url().split('?').next().unwrap_or("/").to_string();
        let method = request.method().clone();
        let response = match route(&method, &path) {
            Route::SubmitScore => submit_score(&mut request, store),
            Route::ListScores => list_scores(store),
            Route::Preflight => with_cors(Response::empty(StatusCode(204))).boxed(),
            Route::Page(p) => serve_file(root, p),
            Route::NotAllowed => json_response(
                405,
                json!({ "success": false, "message": "Method not allowed." }),
            ),
        };
        let status = response.status_code().0;
        if let Err(e) = request.respond(response) {
            eprintln!("failed to respond to {}: {}", path, e);
        }
        status
    }

    fn submit_score(request: &mut Request, store: &ScoreStore) -> ResponseBox {
        let mut body = String::new();
        if let Err(e) = request.as_reader().take(MAX_BODY).read_to_string(&mut body) {
            eprintln!("unreadable score body: {}", e);
            return rejected();
        }
        let submission = match ScoreSubmission::parse(&body) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("rejected score: {}", e);
                return rejected();
            }
        };
        match store.append(&submission.name, submission.score) {
            Ok(record) => {
                println!("Score saved: {}, {}", record.name, record.score);
                json_response(
                    201,
                    json!({ "success": true, "message": "Score saved successfully." }),
                )
            }
            Err(e) if e.is_rejection() => rejected(),
            Err(e) => {
                eprintln!("Error saving score: {}", e);
                json_response(
                    500,
                    json!({ "success": false, "message": "Failed to save score." }),
                )
            }
        }
    }

    fn rejected() -> ResponseBox {
        json_response(
            400,
            json!({ "success": false, "message": "Invalid name or score." }),
        )
    }

    fn list_scores(store: &ScoreStore) -> ResponseBox {
        match store.top().map(serde_json::to_value) {
            Ok(Ok(scores)) => {
                println!("Sending {} scores", scores.as_array().map_or(0, Vec::len));
                json_response(200, scores)
            }
            Ok(Err(e)) => {
                eprintln!("Error encoding scores: {}", e);
                json_response(
                    500,
                    json!({ "error": "Failed to load scores", "details": e.to_string() }),
                )
            }
            Err(e) => {
                eprintln!("Error reading scores: {}", e);
                json_response(
                    500,
                    json!({ "error": "Failed to load scores", "details": e.to_string() }),
                )
            }
        }
    }

    fn json_response(status: u16, body: Value) -> ResponseBox {
        let mut resp = Response::from_string(body.to_string()).with_status_code(StatusCode(status));
        if let Ok(h) = Header::from_bytes("Content-Type", "application/json".as_bytes()) {
            resp.add_header(h);
        }
        with_cors(resp).boxed()
    }

    fn with_cors<R: Read>(mut resp: Response<R>) -> Response<R> {
        for (name, value) in [
            ("Access-Control-Allow-Origin", "*"),
            (
                "Access-Control-Allow-Headers",
                "Origin, X-Requested-With, Content-Type, Accept",
            ),
        ] {
            if let Ok(h) = Header::from_bytes(name, value.as_bytes()) {
                resp.add_header(h);
            }
        }
        resp
    }

    /// Static asset, or `index.html` for any path that is not a file so the
    /// game page answers every unknown route.
    fn serve_file(root: &Path, url: &str) -> ResponseBox {
        let path = sanitize_path(root, url).or_else(|| sanitize_path(root, "/index.html"));
        let Some(path) = path else {
            return not_found_response();
        };
        match fs::File::open(&path) {
            Ok(file) => {
                let mut resp = Response::from_file(file).with_status_code(StatusCode(200));
                if let Ok(h) = Header::from_bytes("Content-Type", content_type_for(&path).as_bytes()) {
                    resp.add_header(h);
                }
                resp.boxed()
            }
            Err(_) => not_found_response(),
        }
    }

    fn sanitize_path(root: &Path, url: &str) -> Option<PathBuf> {
        let rel = url.trim_start_matches('/');
        let rel = if rel.is_empty() { "index.html" } else { rel };
        let full = fs::canonicalize(root.join(rel)).ok()?;
        let path = if full.is_dir() { full.join("index.html") } else { full };
        if path.is_file() && path.starts_with(root) {
            Some(path)
        } else {
            None
        }
    }

    fn content_type_for(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
            "html" => "text/html; charset=utf-8",
            "js" => "application/javascript",
            "css" => "text/css",
            "wasm" => "application/wasm",
            "json" => "application/json",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "svg" => "image/svg+xml",
            "wav" => "audio/wav",
            "mp3" => "audio/mpeg",
            _ => "application/octet-stream",
        }
    }

    fn not_found_response() -> ResponseBox {
        Response::from_string("Not Found")
            .with_status_code(StatusCode(404))
            .boxed()
    }

}
