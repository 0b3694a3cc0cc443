//! Embedded HTML/CSS/JS chat page.
//!
//! The page keeps the session identifier in `localStorage`, sends through
//! `/api/chat`, and asks `/api/reduce` for the next state after every step.
//! The chart is drawn as inline SVG; no external assets.

/// The complete single-page chat UI.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>glucochat</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --purple: #bc8cff;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app {
  display: grid;
  grid-template-columns: minmax(0, 3fr) minmax(0, 2fr);
  gap: 16px;
  height: 100vh;
  padding: 16px;
}
.app.response { grid-template-columns: 1fr 0; }
.app.response .panel { display: none; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
}

.chat { display: flex; flex-direction: column; min-height: 0; }
.chat header { display: flex; justify-content: space-between; margin-bottom: 12px; }
.chat header h1 { font-size: 18px; }
.chat header .session { color: var(--text-muted); font-size: 12px; }

.transcript { flex: 1; overflow-y: auto; display: flex; flex-direction: column; gap: 10px; }
.msg { max-width: 80%; padding: 8px 12px; border-radius: var(--radius); white-space: pre-wrap; }
.msg.user { align-self: flex-end; background: #1f6feb33; }
.msg.assistant { align-self: flex-start; background: #30363d66; }
.msg .cites { margin-top: 6px; font-size: 12px; color: var(--text-muted); }
.msg .cites a { color: var(--accent); }

.chips { display: flex; gap: 8px; margin: 12px 0 8px; flex-wrap: wrap; }
.chip {
  border: 1px solid var(--border); background: transparent; color: var(--text);
  border-radius: 999px; padding: 4px 12px; cursor: pointer;
}
.chip:hover { border-color: var(--accent); }

form { display: flex; gap: 8px; }
form input {
  flex: 1; background: var(--bg); color: var(--text);
  border: 1px solid var(--border); border-radius: var(--radius); padding: 8px 12px;
}
form button {
  background: var(--accent); color: #000; border: 0; border-radius: var(--radius);
  padding: 8px 16px; cursor: pointer;
}
form button:disabled, form input:disabled { opacity: 0.5; cursor: wait; }

.panel { overflow-y: auto; }
.panel h2 { font-size: 15px; margin-bottom: 12px; }
.gauge { display: flex; gap: 12px; margin-bottom: 16px; }
.gauge div { flex: 1; text-align: center; }
.gauge .value { font-size: 22px; font-weight: 600; color: var(--green); }
.gauge .label { color: var(--text-muted); font-size: 12px; }
.legend { font-size: 12px; color: var(--text-muted); margin-top: 6px; }
.legend .g { color: var(--accent); }
.legend .i { color: var(--purple); }

.vendor { border-top: 1px solid var(--border); padding: 10px 0; }
.vendor:first-child { border-top: 0; }
.vendor .title { font-weight: 600; }
.vendor .meta { color: var(--text-muted); font-size: 12px; }
.vendor .tag {
  display: inline-block; font-size: 11px; border: 1px solid var(--border);
  border-radius: 999px; padding: 0 8px; margin: 4px 4px 0 0;
}
</style>
</head>
<body>
<div id="app" class="app response">
  <section class="card chat">
    <header>
      <h1>Metabolic Health Assistant</h1>
      <span class="session" id="session"></span>
    </header>
    <div class="transcript" id="transcript"></div>
    <div class="chips" id="chips"></div>
    <form id="composer">
      <input id="input" autocomplete="off" placeholder="Ask about your glucose, insulin, or bio-age...">
      <button id="send" type="submit">Send</button>
    </form>
  </section>
  <aside class="card panel" id="panel"></aside>
</div>
<script>
const SESSION_KEY = 'glucochat_session_id';

function sessionId() {
  let id = localStorage.getItem(SESSION_KEY);
  if (!id) {
    id = (crypto.randomUUID && crypto.randomUUID()) ||
      String(Date.now()) + '-' + Math.random().toString(16).slice(2);
    localStorage.setItem(SESSION_KEY, id);
  }
  return id;
}

let state = null;

async function reduce(event) {
  const res = await fetch('/api/reduce', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ state, session_id: sessionId(), event }),
  });
  if (!res.ok) throw new Error('reduce failed: ' + res.status);
  state = await res.json();
  if (state.session_id && state.session_id !== localStorage.getItem(SESSION_KEY)) {
    localStorage.setItem(SESSION_KEY, state.session_id);
  }
  render();
}

async function send(text) {
  text = text.trim();
  if (!text || (state && state.pending)) return false;
  try {
    await reduce({ type: 'sent', text });
  } catch (err) {
    console.error(err);
    return false;
  }
  try {
    const res = await fetch('/api/chat', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ message: text, session_id: state.session_id }),
    });
    if (!res.ok) throw new Error('chat failed: ' + res.status);
    await reduce({ type: 'replied', body: await res.json() });
  } catch (err) {
    console.error(err);
    await reduce({ type: 'failed' }).catch(e => {
      console.error(e);
      if (state) { state.pending = false; render(); }
    });
  }
  return true;
}

function el(tag, cls, text) {
  const node = document.createElement(tag);
  if (cls) node.className = cls;
  if (text !== undefined) node.textContent = text;
  return node;
}

function render() {
  const app = document.getElementById('app');
  app.className = 'app ' + (state ? state.mode : 'response');
  document.getElementById('session').textContent = state ? 'session ' + state.session_id.slice(0, 8) : '';

  const transcript = document.getElementById('transcript');
  transcript.replaceChildren();
  for (const m of (state ? state.messages : [])) {
    const node = el('div', 'msg ' + m.role, m.content);
    if (m.citations && m.citations.length) {
      const cites = el('div', 'cites');
      m.citations.forEach((c, i) => {
        const label = c.name + (c.page != null ? ' p.' + c.page : '');
        const item = c.url ? el('a', null, label) : el('span', null, label);
        if (c.url) { item.href = c.url; item.target = '_blank'; }
        if (i > 0) cites.append(' · ');
        cites.append(item);
      });
      node.append(cites);
    }
    transcript.append(node);
  }
  transcript.scrollTop = transcript.scrollHeight;

  const busy = !!(state && state.pending);
  document.getElementById('input').disabled = busy;
  document.getElementById('send').disabled = busy;

  const panel = document.getElementById('panel');
  panel.replaceChildren();
  if (!state) return;
  if (state.mode === 'analysis') renderAnalysis(panel);
  if (state.mode === 'solution') renderSolution(panel);
}

function renderAnalysis(panel) {
  panel.append(el('h2', null, 'Biological Age'));
  const gauge = el('div', 'gauge');
  const m = state.bio_age;
  const cell = (value, label) => {
    const d = el('div');
    d.append(el('div', 'value', value), el('div', 'label', label));
    return d;
  };
  gauge.append(
    cell(m ? m.baseline.toFixed(1) : '--', 'Clinical'),
    cell(m ? m.target.toFixed(1) : '--', 'Target'),
    cell(m ? m.improvement.toFixed(1) : '--', 'Improvement'),
  );
  panel.append(gauge, el('h2', null, 'Kraft Curve'), chart(state.chart));
  const legend = el('div', 'legend');
  legend.innerHTML = '<span class="g">&#9632; glucose (mg/dL)</span> &nbsp; <span class="i">&#9632; insulin (&micro;IU/mL)</span>';
  panel.append(legend);
}

function chart(points) {
  const W = 400, H = 220, P = 28;
  const ns = 'http://www.w3.org/2000/svg';
  const svg = document.createElementNS(ns, 'svg');
  svg.setAttribute('viewBox', `0 0 ${W} ${H}`);
  svg.setAttribute('width', '100%');
  if (!points.length) return svg;
  const maxG = Math.max(...points.map(p => p.glucose_value), 1);
  const maxI = Math.max(...points.map(p => p.insulin_value), 1);
  const x = i => P + (points.length === 1 ? 0 : i * (W - 2 * P) / (points.length - 1));
  const line = (key, max, color) => {
    const pl = document.createElementNS(ns, 'polyline');
    pl.setAttribute('points', points.map((p, i) => `${x(i)},${H - P - (p[key] / max) * (H - 2 * P)}`).join(' '));
    pl.setAttribute('fill', 'none');
    pl.setAttribute('stroke', color);
    pl.setAttribute('stroke-width', '2');
    svg.append(pl);
  };
  line('glucose_value', maxG, '#58a6ff');
  line('insulin_value', maxI, '#bc8cff');
  points.forEach((p, i) => {
    if (points.length > 6 && i % 2) return;
    const t = document.createElementNS(ns, 'text');
    t.setAttribute('x', x(i));
    t.setAttribute('y', H - 8);
    t.setAttribute('fill', '#8b949e');
    t.setAttribute('font-size', '10');
    t.setAttribute('text-anchor', 'middle');
    t.textContent = p.time_label;
    svg.append(t);
  });
  return svg;
}

function renderSolution(panel) {
  panel.append(el('h2', null, 'Recommended Providers'));
  const vendors = state.vendors.length ? state.vendors : [{
    title: 'No providers yet', category: '', price: '', tags: [],
    description: 'Ask for a specialist to see recommended providers.',
  }];
  for (const v of vendors) {
    const card = el('div', 'vendor');
    card.append(el('div', 'title', v.title));
    const meta = [v.category, v.price].filter(Boolean).join(' · ');
    if (meta) card.append(el('div', 'meta', meta));
    if (v.description) card.append(el('div', null, v.description));
    for (const t of v.tags || []) card.append(el('span', 'tag', t));
    panel.append(card);
  }
}

async function loadChips() {
  const res = await fetch('/api/chips');
  const { chips } = await res.json();
  const box = document.getElementById('chips');
  for (const text of chips) {
    const b = el('button', 'chip', text);
    b.type = 'button';
    b.onclick = () => send(text);
    box.append(b);
  }
}

document.getElementById('composer').addEventListener('submit', e => {
  e.preventDefault();
  const input = document.getElementById('input');
  const text = input.value;
  input.value = '';
  send(text).then(sent => {
    if (!sent && !input.value) input.value = text;
  });
});

sessionId();
render();
loadChips().catch(console.error);
</script>
</body>
</html>
"##;
