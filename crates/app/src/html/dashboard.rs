pub const DASHBOARD_HTML: &str = r#"
<!doctype html>
<html lang="en" class="h-full dark">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Gesture Pointer</title>
  <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  <style type="text/tailwindcss">
    @theme {
      --color-panel: #0f172a;
      --color-panel-light: #1e293b;
      --color-accent: #38bdf8;
      --color-danger: #fb7185;
      --color-success: #4ade80;
    }

    @layer components {
      .btn {
        @apply rounded-md px-4 py-2 text-sm font-semibold transition disabled:cursor-not-allowed disabled:opacity-40;
      }
    }
  </style>
  <script defer src="https://cdn.jsdelivr.net/npm/alpinejs@3.13.5/dist/cdn.min.js" crossorigin="anonymous"></script>
</head>

<body x-data="pointerApp()" x-init="init()" class="h-full bg-slate-950 text-slate-100">
  <main class="mx-auto flex max-w-5xl flex-col gap-6 p-6">
    <header class="flex items-center justify-between">
      <h1 class="text-2xl font-bold tracking-wide">Gesture Pointer</h1>
      <span class="text-sm text-slate-400" x-text="statusText"></span>
    </header>

    <section class="grid gap-6 md:grid-cols-[2fr_1fr]">
      <div class="overflow-hidden rounded-lg bg-panel shadow-lg">
        <img src="/video_feed" alt="Camera preview" class="block w-full" />
      </div>

      <div class="flex flex-col gap-4 rounded-lg bg-panel p-4">
        <div class="grid grid-cols-2 gap-2">
          <button type="button" class="btn bg-accent text-slate-900" :disabled="running" @click="startCamera()">Start camera</button>
          <button type="button" class="btn bg-danger text-slate-900" :disabled="!running" @click="stopCamera()">Stop camera</button>
          <button type="button" class="btn bg-success text-slate-900" :disabled="!running || tracking" @click="enableTracking()">Enable tracking</button>
          <button type="button" class="btn bg-panel-light" :disabled="!running || !tracking" @click="disableTracking()">Disable tracking</button>
        </div>

        <label class="flex flex-col gap-1 text-sm">
          Click distance (px)
          <input type="number" min="0" step="1" x-model.number="clickDistance" @change="updateClickDistance()"
            class="rounded-md bg-panel-light px-3 py-2" />
        </label>

        <label class="flex flex-col gap-1 text-sm">
          Click re-arm
          <select x-model="rearmPolicy" @change="updateRearmPolicy()" class="rounded-md bg-panel-light px-3 py-2">
            <option value="interval">After debounce interval</option>
            <option value="release">After pinch release</option>
          </select>
        </label>

        <pre class="h-48 overflow-y-auto rounded-md bg-slate-950 p-2 text-xs text-slate-400" x-text="log.join('\n')"></pre>
      </div>
    </section>
  </main>

  <script>
    function pointerApp() {
      return {
        running: false,
        tracking: false,
        clickDistance: 20,
        rearmPolicy: 'interval',
        statusText: 'Idle',
        log: [],

        async init() {
          try {
            const status = await (await fetch('/api/status')).json();
            this.running = status.camera_active;
            this.tracking = status.tracking_enabled;
            this.clickDistance = status.pinch_threshold;
            this.rearmPolicy = status.rearm_policy;
            this.statusText = this.running ? 'Camera running' : 'Idle';
          } catch (error) {
            this.write(`Status unavailable: ${error.message}`);
          }
          window.addEventListener('beforeunload', () => {
            if (this.running) {
              navigator.sendBeacon('/api/stop_camera');
            }
          });
          this.write('Dashboard ready');
        },

        write(message) {
          const stamp = new Date().toLocaleTimeString();
          this.log.unshift(`[${stamp}] ${message}`);
          this.log = this.log.slice(0, 200);
        },

        async call(endpoint, body = {}) {
          try {
            const response = await fetch(endpoint, {
              method: 'POST',
              headers: { 'Content-Type': 'application/json' },
              body: JSON.stringify(body),
            });
            return await response.json();
          } catch (error) {
            return { status: 'error', message: error.message };
          }
        },

        async startCamera() {
          const result = await this.call('/api/start_camera');
          this.write(result.message);
          if (result.status === 'success') {
            this.running = true;
            this.statusText = 'Camera running';
          } else {
            this.statusText = `Error: ${result.message}`;
          }
        },

        async stopCamera() {
          const result = await this.call('/api/stop_camera');
          this.write(result.message);
          if (result.status === 'success') {
            this.running = false;
            this.tracking = false;
            this.statusText = 'Camera stopped';
            await this.call('/api/disable_tracking');
          }
        },

        async enableTracking() {
          const result = await this.call('/api/enable_tracking');
          this.write(result.message);
          if (result.status === 'success') {
            this.tracking = true;
            this.statusText = 'Mouse control enabled';
          }
        },

        async disableTracking() {
          const result = await this.call('/api/disable_tracking');
          this.write(result.message);
          if (result.status === 'success') {
            this.tracking = false;
            this.statusText = 'Mouse control disabled';
          }
        },

        async updateClickDistance() {
          if (Number.isNaN(this.clickDistance)) return;
          const result = await this.call('/api/set_click_distance', { distance: this.clickDistance });
          this.write(result.message);
        },

        async updateRearmPolicy() {
          const result = await this.call('/api/set_rearm_policy', { policy: this.rearmPolicy });
          this.write(result.message);
        },
      };
    }
  </script>
</body>

</html>
"#;
