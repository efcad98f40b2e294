//! The remote build plan: an ordered, typed sequence of stages.
//!
//! The original deployment tooling shipped the whole build as one opaque
//! shell blob. Here each stage is a typed unit with its own shell snippet
//! and an optional fallback snippet, executed fail-fast by the build
//! driver. The fallback is attempted exactly once, in-stage, before the
//! stage is declared failed.
//!
//! Snippets are target-independent; the driver wraps each one with
//! `set -e`, the Go toolchain `PATH` entry, and a `cd` into the remote
//! working directory.

use std::fmt;

/// Minimum acceptable Go minor version on the build host.
pub const GO_MIN_VERSION: &str = "1.21";
/// Pinned Go version installed when the host toolchain is absent or stale.
pub const GO_PINNED_VERSION: &str = "1.21.13";
/// Module mirror tried first (fast inside mainland networks).
pub const PRIMARY_GOPROXY: &str = "https://goproxy.cn,direct";
/// Mirror list switched to when the primary probe fails.
pub const SECONDARY_GOPROXY: &str = "https://goproxy.io,https://proxy.golang.org,direct";
/// Prefix of the produced package directory; the remote build appends a
/// `-<YYYYMMDD-HHMMSS>` timestamp suffix.
pub const PACKAGE_PREFIX: &str = "hygon-dcgm-exporter";
/// Marker file the package stage writes so the retriever can discover the
/// timestamped package name.
pub const MARKER_FILE: &str = "build_info.txt";

/// One discrete step of the remote build procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageName {
    Extract,
    Toolchain,
    ProxyConfig,
    Patch,
    FetchDeps,
    Compile,
    Package,
}

impl StageName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Toolchain => "toolchain",
            Self::ProxyConfig => "proxy-config",
            Self::Patch => "patch",
            Self::FetchDeps => "fetch-deps",
            Self::Compile => "compile",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage's shell snippets. `fallback` is the secondary strategy run
/// once after the primary fails.
#[derive(Clone, Debug)]
pub struct Stage {
    pub name: StageName,
    pub primary: String,
    pub fallback: Option<String>,
}

/// The full ordered build procedure for one run.
///
/// Stage ordering is fixed: proxy configuration always precedes the
/// dependency fetch, and patching always precedes compilation.
#[derive(Clone, Debug)]
pub struct BuildPlan {
    remote_dir: String,
    stages: Vec<Stage>,
}

impl BuildPlan {
    /// Build the stage list for an uploaded archive named `archive_name`
    /// sitting in `remote_dir`.
    #[must_use]
    pub fn new(remote_dir: &str, archive_name: &str) -> Self {
        let stages = vec![
            Stage {
                name: StageName::Extract,
                primary: format!("echo \"extracting {archive_name}\"\ntar -xzf {archive_name}"),
                fallback: None,
            },
            Stage {
                name: StageName::Toolchain,
                primary: TOOLCHAIN_CHECK_INSTALL.to_string(),
                fallback: Some(TOOLCHAIN_PACKAGE_MANAGER.to_string()),
            },
            Stage {
                name: StageName::ProxyConfig,
                primary: PROXY_PRIMARY.to_string(),
                fallback: Some(PROXY_SECONDARY.to_string()),
            },
            Stage {
                name: StageName::Patch,
                primary: PATCH_COMPAT.to_string(),
                fallback: None,
            },
            Stage {
                name: StageName::FetchDeps,
                primary: FETCH_DEPS_QUIET.to_string(),
                fallback: Some(FETCH_DEPS_VERBOSE.to_string()),
            },
            Stage {
                name: StageName::Compile,
                primary: COMPILE_TAGGED.to_string(),
                fallback: Some(COMPILE_PLAIN.to_string()),
            },
            Stage {
                name: StageName::Package,
                primary: PACKAGE_AND_MARK.to_string(),
                fallback: None,
            },
        ];
        Self {
            remote_dir: remote_dir.to_string(),
            stages,
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Wrap a stage snippet into a runnable remote command.
    #[must_use]
    pub fn wrap(&self, snippet: &str) -> String {
        format!(
            "set -e\nexport PATH=/usr/local/go/bin:$PATH\ncd {}\n{snippet}",
            self.remote_dir
        )
    }
}

// ── Stage snippets ────────────────────────────────────────────────────────────

const TOOLCHAIN_CHECK_INSTALL: &str = r#"if command -v go >/dev/null 2>&1; then
    GO_VERSION=$(go version | sed 's/.*go\([0-9]*\.[0-9]*\).*/\1/')
    echo "found go ${GO_VERSION}"
    if [ "$(printf '%s\n' "$GO_VERSION" "1.21" | sort -V | head -n1)" = "1.21" ]; then
        echo "go version satisfies minimum 1.21"
        exit 0
    fi
    echo "go ${GO_VERSION} is below the 1.21 minimum, upgrading"
fi
echo "installing go 1.21.13 from go.dev"
cd /tmp
wget -q https://go.dev/dl/go1.21.13.linux-amd64.tar.gz
rm -rf /usr/local/go
tar -C /usr/local -xzf go1.21.13.linux-amd64.tar.gz
export PATH=/usr/local/go/bin:$PATH
go version"#;

const TOOLCHAIN_PACKAGE_MANAGER: &str = r#"echo "go.dev download unavailable, falling back to the distro package manager"
if command -v apt-get >/dev/null 2>&1; then
    apt-get update -qq
    apt-get install -y -qq golang-go
else
    yum install -y golang
fi
go version"#;

const PROXY_PRIMARY: &str = r#"go env -w GO111MODULE=on
go env -w GOPROXY="https://goproxy.cn,direct"
go env -w GOSUMDB="sum.golang.google.cn"
echo "probing module mirror goproxy.cn"
curl -I -s --connect-timeout 10 https://goproxy.cn >/dev/null
echo "primary module mirror reachable""#;

const PROXY_SECONDARY: &str = r#"echo "primary mirror unreachable, switching to the secondary mirror list"
go env -w GO111MODULE=on
go env -w GOPROXY="https://goproxy.io,https://proxy.golang.org,direct"
go env -w GOSUMDB="sum.golang.google.cn""#;

// Each rewrite is idempotent and guarded on its target file, so a tree
// that was already patched (or never had the file) passes through clean.
// The go.mod directive is normalized first: a three-part `go X.Y.Z` is
// cut down to `X.Y`, and a version that still disagrees with the
// installed toolchain is synced to it, so fetch and compile never trip
// over a declaration newer than the build host's Go.
const PATCH_COMPAT: &str = r#"GO_TOOLCHAIN=$(go version | sed 's/.*go\([0-9]*\.[0-9]*\).*/\1/')
if [ -f go.mod ]; then
    MOD_GO=$(grep '^go ' go.mod | awk '{print $2}')
    case "$MOD_GO" in
        *.*.*)
            sed -i "s/^go .*/go $(echo "$MOD_GO" | cut -d. -f1,2)/" go.mod
            echo "normalized go.mod go directive from ${MOD_GO}"
            ;;
        ""|"$GO_TOOLCHAIN")
            echo "go.mod go directive already matches the toolchain"
            ;;
        *)
            sed -i "s/^go .*/go ${GO_TOOLCHAIN}/" go.mod
            echo "synced go.mod go directive ${MOD_GO} to toolchain ${GO_TOOLCHAIN}"
            ;;
    esac
fi
if [ -f internal/pkg/collector/variables.go ]; then
    sed -i 's/var os osinterface.OS = osinterface.RealOS{}/var osInterface osinterface.OS = osinterface.RealOS{}/' internal/pkg/collector/variables.go
    find internal/pkg/collector -name '*.go' -exec sed -i 's/\bos\./osInterface./g' {} \;
    echo "patched collector os variable collision"
else
    echo "variables.go absent, skipping os collision patch"
fi
if [ -f internal/pkg/collector/collector_factory.go ]; then
    sed -i '/^[[:space:]]*"os"$/d' internal/pkg/collector/collector_factory.go
fi
if [ -f internal/pkg/collector/hygon_collector.go ]; then
    sed -i 's/Name:   metricName,/Counter: counters.Counter{PromType: "gauge", FieldName: metricName},/' internal/pkg/collector/hygon_collector.go
    echo "patched Metric struct initialization"
else
    echo "hygon_collector.go absent, skipping Metric struct patch"
fi"#;

const FETCH_DEPS_QUIET: &str = r#"go clean -modcache
echo "downloading module dependencies"
go mod download
go mod tidy"#;

const FETCH_DEPS_VERBOSE: &str = r#"echo "retrying module download in verbose mode"
go mod download -x
go mod tidy"#;

const COMPILE_TAGGED: &str = r#"echo "building with the hygon build tag"
CGO_ENABLED=0 GOOS=linux GOARCH=amd64 go build -tags="hygon" -o hygon-dcgm-exporter ./cmd/dcgm-exporter
test -f hygon-dcgm-exporter"#;

const COMPILE_PLAIN: &str = r#"echo "hygon-tagged build failed, retrying without the tag"
CGO_ENABLED=0 GOOS=linux GOARCH=amd64 go build -v -o hygon-dcgm-exporter ./cmd/dcgm-exporter
test -f hygon-dcgm-exporter"#;

const PACKAGE_AND_MARK: &str = r##"PACKAGE_NAME="hygon-dcgm-exporter-$(date +%Y%m%d-%H%M%S)"
echo "assembling package ${PACKAGE_NAME}"
mkdir -p "${PACKAGE_NAME}/etc"
cp hygon-dcgm-exporter "${PACKAGE_NAME}/"
chmod +x "${PACKAGE_NAME}/hygon-dcgm-exporter"
cp etc/hygon-counters.csv "${PACKAGE_NAME}/etc/" 2>/dev/null || echo "# hygon DCU counter configuration" > "${PACKAGE_NAME}/etc/hygon-counters.csv"
cat > "${PACKAGE_NAME}/start.sh" <<'EOF'
#!/bin/bash
echo "starting hygon-dcgm-exporter on :9400"
echo "metrics:  http://localhost:9400/metrics"
echo "health:   http://localhost:9400/health"
exec ./hygon-dcgm-exporter --use-hygon-mode
EOF
chmod +x "${PACKAGE_NAME}/start.sh"
cat > "${PACKAGE_NAME}/install.sh" <<'EOF'
#!/bin/bash
if [ "$EUID" -ne 0 ]; then
    echo "install.sh must run as root" >&2
    exit 1
fi
INSTALL_DIR="/opt/hygon-dcgm-exporter"
mkdir -p "$INSTALL_DIR"
cp hygon-dcgm-exporter "$INSTALL_DIR/"
cp -r etc "$INSTALL_DIR/" 2>/dev/null || true
cp start.sh "$INSTALL_DIR/"
chmod +x "$INSTALL_DIR/hygon-dcgm-exporter" "$INSTALL_DIR/start.sh"
echo "installed to $INSTALL_DIR"
EOF
chmod +x "${PACKAGE_NAME}/install.sh"
cat > "${PACKAGE_NAME}/README.md" <<'EOF'
# hygon-dcgm-exporter

## Quick start
    ./start.sh          # run in place
    sudo ./install.sh   # install under /opt

## Verify
    curl http://localhost:9400/health
    curl http://localhost:9400/metrics | grep hygon_
EOF
tar -czf "${PACKAGE_NAME}.tar.gz" "${PACKAGE_NAME}"
echo "PACKAGE_NAME=${PACKAGE_NAME}" > build_info.txt
echo "package ready: ${PACKAGE_NAME}.tar.gz""##;
